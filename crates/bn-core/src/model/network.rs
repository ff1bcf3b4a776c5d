//! Bayesian network: a sealed DAG with one conditional distribution per variable.

use bn_common::{Error, Result, VariableId};
use std::fmt;

use crate::dag::SealedDag;
use crate::model::assignment::Assignment;
use crate::model::distributions::ConditionalDistribution;
use crate::model::layout::ParentLayout;
use crate::variables::Variables;

#[derive(Debug, Clone)]
pub struct BayesianNetwork {
    dag: SealedDag,
    layouts: Vec<ParentLayout>,
    distributions: Vec<ConditionalDistribution>,
}

impl BayesianNetwork {
    /// Network with default distributions for every variable.
    ///
    /// Fails with `UnsupportedFamily` if some variable's parent types have
    /// no conditional family.
    pub fn new(dag: SealedDag) -> Result<Self> {
        let mut layouts = Vec::with_capacity(dag.variables().len());
        let mut distributions = Vec::with_capacity(dag.variables().len());
        for var in dag.variables() {
            let layout = ParentLayout::from_parents(dag.variables(), dag.parent_set(var.id())?)?;
            distributions.push(ConditionalDistribution::default_for(var, &layout)?);
            layouts.push(layout);
        }
        Ok(Self {
            dag,
            layouts,
            distributions,
        })
    }

    pub fn dag(&self) -> &SealedDag {
        &self.dag
    }

    pub fn variables(&self) -> &Variables {
        self.dag.variables()
    }

    pub fn layout(&self, var: VariableId) -> Result<&ParentLayout> {
        self.layouts
            .get(var.index())
            .ok_or_else(|| Error::UnknownVariable(var.to_string()))
    }

    pub fn distribution(&self, var: VariableId) -> Result<&ConditionalDistribution> {
        self.distributions
            .get(var.index())
            .ok_or_else(|| Error::UnknownVariable(var.to_string()))
    }

    pub fn distributions(&self) -> &[ConditionalDistribution] {
        &self.distributions
    }

    /// Replace a variable's distribution after checking it fits.
    pub fn set_distribution(&mut self, var: VariableId, dist: ConditionalDistribution) -> Result<()> {
        let variable = self.dag.variables().variable(var)?;
        dist.validate(variable, &self.layouts[var.index()])?;
        self.distributions[var.index()] = dist;
        Ok(())
    }

    /// Same structure and every distribution within `tolerance`, matching
    /// variables by name.
    pub fn equal_networks(&self, other: &Self, tolerance: f64) -> bool {
        if self.dag != other.dag {
            return false;
        }
        self.variables().iter().all(|var| {
            let Some(theirs) = other.variables().by_name(var.name()) else {
                return false;
            };
            self.distributions[var.id().index()]
                .equal_dist(&other.distributions[theirs.id().index()], tolerance)
        })
    }

    /// Joint log probability of a complete assignment.
    pub fn log_probability(&self, assignment: &Assignment) -> Result<f64> {
        assignment.validate(self.variables())?;
        let mut total = 0.0;
        for var in self.variables() {
            let idx = var.id().index();
            total += self.distributions[idx]
                .log_probability_in(var, &self.layouts[idx], assignment)
                .ok_or_else(|| Error::InvalidEvidence {
                    variable: var.name().to_string(),
                    reason: "joint probability needs every variable observed".to_string(),
                })?;
        }
        Ok(total)
    }

    pub fn number_of_parameters(&self) -> usize {
        self.distributions
            .iter()
            .map(|d| match d {
                ConditionalDistribution::Multinomial { rows } => {
                    rows.iter().map(|r| r.len().saturating_sub(1)).sum()
                }
                ConditionalDistribution::Normal { rows } => 2 * rows.len(),
                ConditionalDistribution::ConditionalLinearGaussian { rows } => {
                    rows.iter().map(|r| r.coefficients.len() + 2).sum()
                }
            })
            .sum()
    }
}

impl fmt::Display for BayesianNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bayesian network")?;
        for var in self.variables() {
            let dist = &self.distributions[var.id().index()];
            writeln!(f, "P({} | parents): {} with {} rows", var.name(), dist.kind_name(), dist.rows())?;
        }
        Ok(())
    }
}
