//! Directed acyclic structure over a variable registry.
//!
//! A [`Dag`] holds one ordered parent set per variable and is freely
//! editable. Edges are type-checked on insertion: a Gaussian variable can
//! never be the parent of a multinomial one, and a parent appears at most
//! once per set. Acyclicity is only required when the structure is sealed
//! into a [`SealedDag`], the read-only form consumed by networks, learners
//! and the inference engine.

use bn_common::{Error, Result, VariableId};
use std::collections::HashSet;
use std::fmt;

use crate::logging::event_names;
use crate::variables::{Variable, Variables};

/// Ordered parents of one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSet {
    child: VariableId,
    parents: Vec<VariableId>,
}

impl ParentSet {
    pub(crate) fn new(child: VariableId) -> Self {
        Self {
            child,
            parents: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, parent: VariableId) {
        self.parents.push(parent);
    }

    /// Remove `parent` if present, keeping the order of the others.
    pub(crate) fn remove(&mut self, parent: VariableId) -> bool {
        match self.parents.iter().position(|p| *p == parent) {
            Some(pos) => {
                self.parents.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn child(&self) -> VariableId {
        self.child
    }

    pub fn parents(&self) -> &[VariableId] {
        &self.parents
    }

    pub fn number_of_parents(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, parent: VariableId) -> bool {
        self.parents.contains(&parent)
    }
}

/// Editable DAG. Cycles are permitted until [`Dag::seal`].
#[derive(Debug, Clone)]
pub struct Dag {
    variables: Variables,
    parents: Vec<ParentSet>,
}

impl Dag {
    /// Empty structure: every variable starts without parents.
    pub fn new(variables: Variables) -> Self {
        let parents = variables.ids().map(ParentSet::new).collect();
        Self { variables, parents }
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn parent_set(&self, child: VariableId) -> Result<&ParentSet> {
        self.parents
            .get(child.index())
            .ok_or_else(|| Error::UnknownVariable(child.to_string()))
    }

    /// All parent sets, indexed by variable id.
    pub fn parent_sets(&self) -> &[ParentSet] {
        &self.parents
    }

    /// Add `parent` at the end of `child`'s parent set.
    pub fn add_parent(&mut self, child: VariableId, parent: VariableId) -> Result<()> {
        let child_var = self.variables.variable(child)?;
        let parent_var = self.variables.variable(parent)?;
        check_edge(child_var, parent_var)?;

        let set = &mut self.parents[child.index()];
        if set.contains(parent) {
            return Err(Error::DuplicateParent {
                child: child_var.name().to_string(),
                parent: parent_var.name().to_string(),
            });
        }
        set.push(parent);
        Ok(())
    }

    /// Remove `parent` from `child`'s parent set. Returns whether an edge
    /// was removed; absent edges and unknown ids are not errors.
    pub fn remove_parent(&mut self, child: VariableId, parent: VariableId) -> bool {
        self.parents
            .get_mut(child.index())
            .map(|set| set.remove(parent))
            .unwrap_or(false)
    }

    pub fn number_of_edges(&self) -> usize {
        self.parents.iter().map(ParentSet::number_of_parents).sum()
    }

    pub fn contains_cycles(&self) -> bool {
        elimination_order(&self.parents).is_none()
    }

    /// Variables ordered so that every parent precedes its children, or
    /// `None` if the structure is cyclic.
    pub fn topological_order(&self) -> Option<Vec<VariableId>> {
        elimination_order(&self.parents)
    }

    /// Freeze the structure, rejecting cycles.
    pub fn seal(self) -> Result<SealedDag> {
        let Some(order) = elimination_order(&self.parents) else {
            let stuck = cyclic_members(&self.parents)
                .into_iter()
                .map(|id| self.variables.name_of(id))
                .collect::<Vec<_>>();
            return Err(Error::CyclicStructure(format!(
                "no elimination order for {{ {} }}",
                stuck.join(", ")
            )));
        };

        let mut children = vec![Vec::new(); self.parents.len()];
        for set in &self.parents {
            for parent in &set.parents {
                children[parent.index()].push(set.child);
            }
        }

        tracing::debug!(
            event = event_names::DAG_SEALED,
            variables = self.variables.len(),
            edges = self.number_of_edges(),
            "structure sealed"
        );

        Ok(SealedDag {
            variables: self.variables,
            parents: self.parents,
            children,
            order,
        })
    }
}

impl PartialEq for Dag {
    fn eq(&self, other: &Self) -> bool {
        same_structure(&self.variables, &self.parents, &other.variables, &other.parents)
    }
}

impl fmt::Display for Dag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_structure(f, &self.variables, &self.parents)
    }
}

/// Read-only, acyclic structure.
#[derive(Debug, Clone)]
pub struct SealedDag {
    variables: Variables,
    parents: Vec<ParentSet>,
    children: Vec<Vec<VariableId>>,
    order: Vec<VariableId>,
}

impl SealedDag {
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn parent_set(&self, child: VariableId) -> Result<&ParentSet> {
        self.parents
            .get(child.index())
            .ok_or_else(|| Error::UnknownVariable(child.to_string()))
    }

    pub fn parent_sets(&self) -> &[ParentSet] {
        &self.parents
    }

    /// Children of `parent`, in variable id order.
    pub fn children(&self, parent: VariableId) -> Result<&[VariableId]> {
        self.children
            .get(parent.index())
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownVariable(parent.to_string()))
    }

    /// Cached topological order.
    pub fn topological_order(&self) -> &[VariableId] {
        &self.order
    }

    pub fn number_of_edges(&self) -> usize {
        self.parents.iter().map(ParentSet::number_of_parents).sum()
    }

    /// Return to an editable structure.
    pub fn into_dag(self) -> Dag {
        Dag {
            variables: self.variables,
            parents: self.parents,
        }
    }
}

impl PartialEq for SealedDag {
    fn eq(&self, other: &Self) -> bool {
        same_structure(&self.variables, &self.parents, &other.variables, &other.parents)
    }
}

impl fmt::Display for SealedDag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_structure(f, &self.variables, &self.parents)
    }
}

/// Type rule shared by static and dynamic structures.
pub(crate) fn check_edge(child: &Variable, parent: &Variable) -> Result<()> {
    if child.is_multinomial() && parent.is_gaussian() {
        return Err(Error::IncompatibleParent {
            child: child.name().to_string(),
            parent: parent.name().to_string(),
        });
    }
    Ok(())
}

/// Repeatedly mark variables whose parents are all marked. The structure
/// is acyclic iff every variable ends up marked; marking order is then a
/// topological order. Quadratic in the variable count.
pub(crate) fn elimination_order(parents: &[ParentSet]) -> Option<Vec<VariableId>> {
    let n = parents.len();
    let mut done = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let mut progressed = false;
        for set in parents {
            let idx = set.child.index();
            if done[idx] {
                continue;
            }
            if set.parents.iter().all(|p| done.get(p.index()).copied().unwrap_or(false)) {
                done[idx] = true;
                order.push(set.child);
                progressed = true;
            }
        }
        if !progressed {
            return None;
        }
    }
    Some(order)
}

/// Variables left over after elimination: members of, or downstream of, a cycle.
fn cyclic_members(parents: &[ParentSet]) -> Vec<VariableId> {
    let mut done = vec![false; parents.len()];
    loop {
        let mut progressed = false;
        for set in parents {
            let idx = set.child.index();
            if !done[idx] && set.parents.iter().all(|p| done[p.index()]) {
                done[idx] = true;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    parents
        .iter()
        .filter(|set| !done[set.child.index()])
        .map(|set| set.child)
        .collect()
}

/// Same variable count and names, and for each variable the same parents
/// by name regardless of insertion order.
pub(crate) fn same_structure(
    a_vars: &Variables,
    a_parents: &[ParentSet],
    b_vars: &Variables,
    b_parents: &[ParentSet],
) -> bool {
    if a_vars.len() != b_vars.len() {
        return false;
    }
    for var in a_vars {
        let Some(other) = b_vars.by_name(var.name()) else {
            return false;
        };
        let (Some(pa), Some(pb)) = (
            a_parents.get(var.id().index()),
            b_parents.get(other.id().index()),
        ) else {
            return false;
        };
        if pa.number_of_parents() != pb.number_of_parents() {
            return false;
        }
        let names_a: HashSet<String> = pa.parents.iter().map(|p| a_vars.name_of(*p)).collect();
        let names_b: HashSet<String> = pb.parents.iter().map(|p| b_vars.name_of(*p)).collect();
        if names_a != names_b {
            return false;
        }
    }
    true
}

fn write_structure(
    f: &mut fmt::Formatter<'_>,
    variables: &Variables,
    parents: &[ParentSet],
) -> fmt::Result {
    writeln!(f, "DAG")?;
    for set in parents {
        let names = set
            .parents
            .iter()
            .map(|p| variables.name_of(*p))
            .collect::<Vec<_>>();
        writeln!(
            f,
            "{} parent sets: {{ {} }}",
            variables.name_of(set.child),
            names.join(", ")
        )?;
    }
    Ok(())
}
