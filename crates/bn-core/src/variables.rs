//! Variable registry.
//!
//! Variables are declared on a [`VariablesBuilder`] and frozen into an
//! immutable [`Variables`] value before any structure is attached to them.
//! Ids are dense and zero-based in declaration order.

use bn_common::{Error, Result, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Value space of a random variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateSpace {
    /// Finite discrete variable with `states` values `0..states`.
    Multinomial { states: usize },
    /// Real-valued variable.
    Gaussian,
}

/// A random variable in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    id: VariableId,
    name: String,
    kind: StateSpace,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_space(&self) -> StateSpace {
        self.kind
    }

    /// Number of states, or 1 for a Gaussian variable.
    pub fn arity(&self) -> usize {
        match self.kind {
            StateSpace::Multinomial { states } => states,
            StateSpace::Gaussian => 1,
        }
    }

    pub fn is_multinomial(&self) -> bool {
        matches!(self.kind, StateSpace::Multinomial { .. })
    }

    pub fn is_gaussian(&self) -> bool {
        matches!(self.kind, StateSpace::Gaussian)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Mutable registry used while variables are being declared.
#[derive(Debug, Default)]
pub struct VariablesBuilder {
    vars: Vec<Variable>,
    by_name: HashMap<String, VariableId>,
}

impl VariablesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a discrete variable with `states` values.
    pub fn new_multinomial(&mut self, name: impl Into<String>, states: usize) -> Result<VariableId> {
        let name = name.into();
        if states < 2 {
            return Err(Error::InvalidVariable(format!(
                "{} needs at least two states, got {}",
                name, states
            )));
        }
        self.push(name, StateSpace::Multinomial { states })
    }

    /// Declare a real-valued variable.
    pub fn new_gaussian(&mut self, name: impl Into<String>) -> Result<VariableId> {
        self.push(name.into(), StateSpace::Gaussian)
    }

    /// Declare a variable with an explicit state space.
    pub fn new_variable(&mut self, name: impl Into<String>, kind: StateSpace) -> Result<VariableId> {
        match kind {
            StateSpace::Multinomial { states } => self.new_multinomial(name, states),
            StateSpace::Gaussian => self.new_gaussian(name),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Freeze the registry.
    pub fn build(self) -> Variables {
        Variables {
            vars: self.vars,
            by_name: self.by_name,
        }
    }

    fn push(&mut self, name: String, kind: StateSpace) -> Result<VariableId> {
        if name.trim().is_empty() {
            return Err(Error::InvalidVariable("variable names cannot be empty".to_string()));
        }
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateVariable(name));
        }
        let id = VariableId(self.vars.len());
        self.by_name.insert(name.clone(), id);
        self.vars.push(Variable { id, name, kind });
        Ok(id)
    }
}

/// Immutable variable registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variables {
    vars: Vec<Variable>,
    by_name: HashMap<String, VariableId>,
}

impl Variables {
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.vars.get(id.index())
    }

    /// Look up a variable, failing with `UnknownVariable` for foreign ids.
    pub fn variable(&self, id: VariableId) -> Result<&Variable> {
        self.get(id)
            .ok_or_else(|| Error::UnknownVariable(id.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn id_of(&self, name: &str) -> Result<VariableId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    /// Variables in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.vars.iter().map(|v| v.id)
    }

    /// Name of a variable, or its id when it does not belong here.
    pub(crate) fn name_of(&self, id: VariableId) -> String {
        self.get(id)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl<'a> IntoIterator for &'a Variables {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}
