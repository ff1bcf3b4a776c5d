//! Observed values for a subset of variables.
//!
//! The same type serves as inference evidence and as one data instance for
//! parameter learning; variables that are absent are unobserved.

use bn_common::{Error, Result, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::variables::{StateSpace, Variable, Variables};

/// An observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// State index of a multinomial variable.
    State(usize),
    /// Value of a Gaussian variable.
    Real(f64),
}

impl Value {
    pub fn as_state(self) -> Option<usize> {
        match self {
            Value::State(s) => Some(s),
            Value::Real(_) => None,
        }
    }

    pub fn as_real(self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(x),
            Value::State(_) => None,
        }
    }

    /// Check that the value lies in the variable's state space.
    pub fn check(self, variable: &Variable) -> Result<()> {
        let reason = match (variable.state_space(), self) {
            (StateSpace::Multinomial { states }, Value::State(s)) if s < states => return Ok(()),
            (StateSpace::Multinomial { states }, Value::State(s)) => {
                format!("state {} out of range 0..{}", s, states)
            }
            (StateSpace::Gaussian, Value::Real(x)) if x.is_finite() => return Ok(()),
            (StateSpace::Gaussian, Value::Real(x)) => format!("non-finite value {}", x),
            (StateSpace::Multinomial { .. }, Value::Real(_)) => {
                "real value for a multinomial variable".to_string()
            }
            (StateSpace::Gaussian, Value::State(_)) => {
                "state index for a gaussian variable".to_string()
            }
        };
        Err(Error::InvalidEvidence {
            variable: variable.name().to_string(),
            reason,
        })
    }
}

/// Partial assignment of values to variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    values: BTreeMap<VariableId, Value>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: VariableId, value: Value) -> Self {
        self.values.insert(var, value);
        self
    }

    /// Set a value, returning the previous one.
    pub fn set(&mut self, var: VariableId, value: Value) -> Option<Value> {
        self.values.insert(var, value)
    }

    pub fn get(&self, var: VariableId) -> Option<Value> {
        self.values.get(&var).copied()
    }

    pub fn remove(&mut self, var: VariableId) -> Option<Value> {
        self.values.remove(&var)
    }

    pub fn contains(&self, var: VariableId) -> bool {
        self.values.contains_key(&var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, Value)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Check every entry against the registry.
    pub fn validate(&self, variables: &Variables) -> Result<()> {
        for (var, value) in self.iter() {
            let variable = variables.variable(var)?;
            value.check(variable)?;
        }
        Ok(())
    }
}

impl FromIterator<(VariableId, Value)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (VariableId, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
