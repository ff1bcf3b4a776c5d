//! Parent configurations.
//!
//! Conditional distributions keep one parameter row per joint state of the
//! multinomial parents. Rows are indexed in mixed radix with the first
//! multinomial parent varying fastest; continuous parents enter through
//! regression coefficients instead of rows.

use bn_common::{Result, VariableId};

use crate::dag::ParentSet;
use crate::model::assignment::Assignment;
use crate::variables::{StateSpace, Variables};

/// Split of a parent set by variable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLayout {
    multinomial: Vec<(VariableId, usize)>,
    continuous: Vec<VariableId>,
}

impl ParentLayout {
    pub fn from_parents(variables: &Variables, parents: &ParentSet) -> Result<Self> {
        let mut multinomial = Vec::new();
        let mut continuous = Vec::new();
        for &parent in parents.parents() {
            match variables.variable(parent)?.state_space() {
                StateSpace::Multinomial { states } => multinomial.push((parent, states)),
                StateSpace::Gaussian => continuous.push(parent),
            }
        }
        Ok(Self {
            multinomial,
            continuous,
        })
    }

    /// Multinomial parents with their state counts, in parent-set order.
    pub fn multinomial_parents(&self) -> &[(VariableId, usize)] {
        &self.multinomial
    }

    pub fn continuous_parents(&self) -> &[VariableId] {
        &self.continuous
    }

    pub fn has_continuous_parents(&self) -> bool {
        !self.continuous.is_empty()
    }

    /// Number of rows: the product of multinomial parent state counts.
    pub fn configurations(&self) -> usize {
        self.multinomial.iter().map(|(_, s)| *s).product()
    }

    /// Row index of a joint parent state, or `None` if out of range.
    pub fn configuration_index(&self, states: &[usize]) -> Option<usize> {
        if states.len() != self.multinomial.len() {
            return None;
        }
        let mut index = 0;
        let mut stride = 1;
        for (&s, &(_, n)) in states.iter().zip(&self.multinomial) {
            if s >= n {
                return None;
            }
            index += s * stride;
            stride *= n;
        }
        Some(index)
    }

    /// Row index selected by an assignment; `None` if a multinomial parent
    /// is unobserved.
    pub fn configuration_of(&self, assignment: &Assignment) -> Option<usize> {
        let states = self
            .multinomial
            .iter()
            .map(|(var, _)| assignment.get(*var).and_then(|v| v.as_state()))
            .collect::<Option<Vec<_>>>()?;
        self.configuration_index(&states)
    }

    /// Joint parent state of a row index.
    pub fn decompose(&self, mut index: usize) -> Vec<usize> {
        self.multinomial
            .iter()
            .map(|(_, n)| {
                let s = index % n;
                index /= n;
                s
            })
            .collect()
    }
}
