//! Two-slice temporal structure (Markov order 1).
//!
//! Every variable `X` gets an interface copy `X_t-1` standing for its value
//! in the previous slice. The interface copies live in the same registry as
//! the slice variables, after them, and can only appear as parents in the
//! transition structure. Time 0 has its own parent sets without interface
//! variables.

use bn_common::{Error, Result, VariableId};
use std::fmt;

use crate::dag::{check_edge, elimination_order, Dag, ParentSet};
use crate::variables::{Variables, VariablesBuilder};

/// Suffix that marks an interface variable.
pub const INTERFACE_SUFFIX: &str = "_t-1";

/// Dynamic Bayesian network structure.
#[derive(Debug, Clone)]
pub struct DynamicDag {
    /// Slice variables followed by their interface copies.
    all: Variables,
    slice_len: usize,
    time0: Vec<ParentSet>,
    /// Indexed over `all`; interface entries never receive parents.
    time_t: Vec<ParentSet>,
}

impl DynamicDag {
    pub fn new(variables: Variables) -> Result<Self> {
        let slice_len = variables.len();
        let mut builder = VariablesBuilder::new();
        for var in &variables {
            builder.new_variable(var.name(), var.state_space())?;
        }
        for var in &variables {
            builder.new_variable(
                format!("{}{}", var.name(), INTERFACE_SUFFIX),
                var.state_space(),
            )?;
        }
        let all = builder.build();
        let empty = |n: usize| {
            (0..n)
                .map(|i| ParentSet::new(VariableId(i)))
                .collect::<Vec<_>>()
        };
        Ok(Self {
            time0: empty(slice_len),
            time_t: empty(2 * slice_len),
            all,
            slice_len,
        })
    }

    /// Slice variables and interface variables together.
    pub fn all_variables(&self) -> &Variables {
        &self.all
    }

    /// Number of variables in one slice.
    pub fn slice_len(&self) -> usize {
        self.slice_len
    }

    /// Interface copy of a slice variable.
    pub fn interface_variable(&self, var: VariableId) -> Result<VariableId> {
        if var.index() < self.slice_len {
            Ok(VariableId(var.index() + self.slice_len))
        } else {
            Err(Error::UnknownVariable(self.all.name_of(var)))
        }
    }

    pub fn is_interface(&self, var: VariableId) -> bool {
        var.index() >= self.slice_len && var.index() < self.all.len()
    }

    pub fn parent_set_time0(&self, child: VariableId) -> Result<&ParentSet> {
        self.time0
            .get(child.index())
            .ok_or_else(|| Error::UnknownVariable(self.all.name_of(child)))
    }

    pub fn parent_set_time_t(&self, child: VariableId) -> Result<&ParentSet> {
        self.slice_child(child)?;
        Ok(&self.time_t[child.index()])
    }

    /// Add an edge to the first slice. Interface variables are not allowed.
    pub fn add_parent_time0(&mut self, child: VariableId, parent: VariableId) -> Result<()> {
        self.slice_child(child)?;
        if self.is_interface(parent) {
            return Err(Error::InvalidVariable(format!(
                "interface variable {} cannot be a parent at time 0",
                self.all.name_of(parent)
            )));
        }
        add_checked(&self.all, &mut self.time0, child, parent)
    }

    /// Add an edge to the transition slice; `parent` may be an interface variable.
    pub fn add_parent_time_t(&mut self, child: VariableId, parent: VariableId) -> Result<()> {
        self.slice_child(child)?;
        add_checked(&self.all, &mut self.time_t, child, parent)
    }

    pub fn remove_parent_time0(&mut self, child: VariableId, parent: VariableId) -> bool {
        remove_from(&mut self.time0, child, parent)
    }

    pub fn remove_parent_time_t(&mut self, child: VariableId, parent: VariableId) -> bool {
        if self.is_interface(child) {
            return false;
        }
        remove_from(&mut self.time_t, child, parent)
    }

    /// True if either slice has a directed cycle among slice variables.
    pub fn contains_cycles(&self) -> bool {
        elimination_order(&self.time0).is_none() || elimination_order(&self.time_t).is_none()
    }

    /// Expand into a static structure over `slices` copies, named `X[t]`.
    pub fn unroll(&self, slices: usize) -> Result<UnrolledDag> {
        if slices == 0 {
            return Err(Error::InvalidVariable(
                "unrolling needs at least one slice".to_string(),
            ));
        }
        if self.contains_cycles() {
            return Err(Error::CyclicStructure(
                "dynamic structure has a cycle within a slice".to_string(),
            ));
        }

        let mut builder = VariablesBuilder::new();
        let mut index = Vec::with_capacity(slices);
        for t in 0..slices {
            let mut row = Vec::with_capacity(self.slice_len);
            for var in self.all.iter().take(self.slice_len) {
                row.push(builder.new_variable(format!("{}[{}]", var.name(), t), var.state_space())?);
            }
            index.push(row);
        }

        let mut dag = Dag::new(builder.build());
        for t in 0..slices {
            for child in 0..self.slice_len {
                let unrolled_child = index[t][child];
                let parents = if t == 0 {
                    &self.time0[child]
                } else {
                    &self.time_t[child]
                };
                for parent in parents.parents() {
                    let unrolled_parent = if parent.index() < self.slice_len {
                        index[t][parent.index()]
                    } else {
                        index[t - 1][parent.index() - self.slice_len]
                    };
                    dag.add_parent(unrolled_child, unrolled_parent)?;
                }
            }
        }

        Ok(UnrolledDag { dag, index })
    }

    fn slice_child(&self, child: VariableId) -> Result<()> {
        if child.index() < self.slice_len {
            Ok(())
        } else if self.is_interface(child) {
            Err(Error::InvalidVariable(format!(
                "interface variable {} cannot have parents",
                self.all.name_of(child)
            )))
        } else {
            Err(Error::UnknownVariable(child.to_string()))
        }
    }
}

impl fmt::Display for DynamicDag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DAG Time 0")?;
        for set in &self.time0 {
            write_set(f, &self.all, set)?;
        }
        writeln!(f)?;
        writeln!(f, "DAG Time T")?;
        for set in self.time_t.iter().take(self.slice_len) {
            write_set(f, &self.all, set)?;
        }
        Ok(())
    }
}

/// Static expansion of a [`DynamicDag`].
#[derive(Debug, Clone)]
pub struct UnrolledDag {
    pub dag: Dag,
    index: Vec<Vec<VariableId>>,
}

impl UnrolledDag {
    /// Id of slice variable `var` at time `slice`.
    pub fn id(&self, slice: usize, var: VariableId) -> Option<VariableId> {
        self.index.get(slice)?.get(var.index()).copied()
    }

    pub fn slices(&self) -> usize {
        self.index.len()
    }
}

fn add_checked(
    all: &Variables,
    sets: &mut [ParentSet],
    child: VariableId,
    parent: VariableId,
) -> Result<()> {
    let child_var = all.variable(child)?;
    let parent_var = all.variable(parent)?;
    check_edge(child_var, parent_var)?;
    let set = &mut sets[child.index()];
    if set.contains(parent) {
        return Err(Error::DuplicateParent {
            child: child_var.name().to_string(),
            parent: parent_var.name().to_string(),
        });
    }
    set.push(parent);
    Ok(())
}

fn remove_from(sets: &mut [ParentSet], child: VariableId, parent: VariableId) -> bool {
    sets.get_mut(child.index())
        .map(|set| set.remove(parent))
        .unwrap_or(false)
}

fn write_set(f: &mut fmt::Formatter<'_>, vars: &Variables, set: &ParentSet) -> fmt::Result {
    let names = set
        .parents()
        .iter()
        .map(|p| vars.name_of(*p))
        .collect::<Vec<_>>();
    writeln!(
        f,
        "{} parent sets: {{ {} }}",
        vars.name_of(set.child()),
        names.join(", ")
    )
}
