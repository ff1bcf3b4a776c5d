//! Exponential-family factor graph.
//!
//! An [`EfModel`] is an arena of node specifications, each a variational
//! family plus the factor the node owns. Nodes only reference nodes added
//! before them, so the arena order is a topological order.

use bn_common::{Error, NodeId, Result, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::expfamily::factors::{
    CategoricalFactor, DiscreteParent, Factor, GaussianFactor, GaussianRow, ProbabilityRow,
    Scalar,
};
use crate::expfamily::families::Family;
use crate::model::{BayesianNetwork, ConditionalDistribution, Value};
use crate::variables::{StateSpace, Variables};

/// One node of the factor graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub label: String,
    /// Network variable represented by the node, if any.
    pub variable: Option<VariableId>,
    pub family: Family,
    pub factor: Factor,
    /// Value fixed when the model was built (data in a learning plate).
    pub observed: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct EfModel {
    variables: Variables,
    nodes: Vec<NodeSpec>,
    children: Vec<Vec<NodeId>>,
    variable_nodes: BTreeMap<VariableId, NodeId>,
}

impl EfModel {
    /// Convert a network with fixed parameters: one node per variable.
    pub fn from_network(network: &BayesianNetwork) -> Result<Self> {
        let variables = network.variables();
        let mut builder = EfModelBuilder::new(variables.clone());
        let mut node_of: Vec<Option<NodeId>> = vec![None; variables.len()];

        for &var in network.dag().topological_order() {
            let variable = variables.variable(var)?;
            let layout = network.layout(var)?;
            let lookup = |p: VariableId| {
                node_of[p.index()].ok_or_else(|| Error::UnknownVariable(variables.name_of(p)))
            };
            let discrete_parents = layout
                .multinomial_parents()
                .iter()
                .map(|&(p, states)| Ok(DiscreteParent { node: lookup(p)?, states }))
                .collect::<Result<Vec<_>>>()?;
            let continuous_parents = layout
                .continuous_parents()
                .iter()
                .map(|&p| lookup(p))
                .collect::<Result<Vec<_>>>()?;

            let factor = match network.distribution(var)? {
                ConditionalDistribution::Multinomial { rows } => {
                    Factor::Categorical(CategoricalFactor {
                        states: variable.arity(),
                        discrete_parents,
                        rows: rows
                            .iter()
                            .map(|r| ProbabilityRow::from_probabilities(r))
                            .collect(),
                    })
                }
                ConditionalDistribution::Normal { rows } => Factor::Gaussian(GaussianFactor {
                    discrete_parents,
                    continuous_parents,
                    rows: rows
                        .iter()
                        .map(|r| GaussianRow {
                            intercept: Scalar::Fixed(r.mean),
                            coefficients: Vec::new(),
                            precision: Scalar::Fixed(r.precision()),
                        })
                        .collect(),
                }),
                ConditionalDistribution::ConditionalLinearGaussian { rows } => {
                    Factor::Gaussian(GaussianFactor {
                        discrete_parents,
                        continuous_parents,
                        rows: rows
                            .iter()
                            .map(|r| GaussianRow {
                                intercept: Scalar::Fixed(r.intercept),
                                coefficients: r.coefficients.iter().map(|b| Scalar::Fixed(*b)).collect(),
                                precision: Scalar::Fixed(1.0 / r.variance),
                            })
                            .collect(),
                    })
                }
            };

            let id = builder.add_variable_node(var, factor)?;
            node_of[var.index()] = Some(id);
        }
        Ok(builder.build())
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    /// Nodes whose factor reads `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node representing a network variable.
    pub fn node_for(&self, var: VariableId) -> Option<NodeId> {
        self.variable_nodes.get(&var).copied()
    }

    /// Parents, children and co-parents of a node.
    pub fn markov_blanket(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |n: NodeId| {
            if n != id && seen.insert(n) {
                out.push(n);
            }
        };
        if let Some(spec) = self.node(id) {
            spec.factor.neighbors().into_iter().for_each(&mut push);
        }
        for &child in self.children(id) {
            push(child);
            if let Some(spec) = self.node(child) {
                spec.factor.neighbors().into_iter().for_each(&mut push);
            }
        }
        out
    }
}

/// Incremental construction of an [`EfModel`].
#[derive(Debug)]
pub struct EfModelBuilder {
    variables: Variables,
    nodes: Vec<NodeSpec>,
    variable_nodes: BTreeMap<VariableId, NodeId>,
}

impl EfModelBuilder {
    pub fn new(variables: Variables) -> Self {
        Self {
            variables,
            nodes: Vec::new(),
            variable_nodes: BTreeMap::new(),
        }
    }

    /// Add a node with an explicit family. Every node the factor reads must
    /// already exist and have the family its role requires.
    pub fn add_node(&mut self, label: impl Into<String>, family: Family, factor: Factor) -> Result<NodeId> {
        let label = label.into();
        self.check_factor(&label, family, &factor)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeSpec {
            label,
            variable: None,
            family,
            factor,
            observed: None,
        });
        Ok(id)
    }

    /// Add the node representing a network variable; the family follows
    /// from the variable type.
    pub fn add_variable_node(&mut self, var: VariableId, factor: Factor) -> Result<NodeId> {
        let variable = self.variables.variable(var)?;
        let family = match variable.state_space() {
            StateSpace::Multinomial { states } => Family::Categorical { states },
            StateSpace::Gaussian => Family::Gaussian,
        };
        let name = variable.name().to_string();
        if self.variable_nodes.contains_key(&var) {
            return Err(Error::DuplicateVariable(name));
        }
        let id = self.add_node(name, family, factor)?;
        self.nodes[id.index()].variable = Some(var);
        self.variable_nodes.insert(var, id);
        Ok(id)
    }

    /// Add a node for one copy of a variable (a data instance in a plate).
    pub fn add_copy_node(
        &mut self,
        var: VariableId,
        label: impl Into<String>,
        factor: Factor,
    ) -> Result<NodeId> {
        let family = match self.variables.variable(var)?.state_space() {
            StateSpace::Multinomial { states } => Family::Categorical { states },
            StateSpace::Gaussian => Family::Gaussian,
        };
        let id = self.add_node(label, family, factor)?;
        self.nodes[id.index()].variable = Some(var);
        Ok(id)
    }

    /// Fix a node's value for every run on the model.
    pub fn observe(&mut self, id: NodeId, value: Value) -> Result<()> {
        let spec = self
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::InvalidEvidence {
                variable: id.to_string(),
                reason: "no such node".to_string(),
            })?;
        if spec.family.observed_moments(value).is_none() {
            return Err(Error::InvalidEvidence {
                variable: spec.label.clone(),
                reason: format!("{:?} is not a value of a {} node", value, spec.family),
            });
        }
        spec.observed = Some(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(self) -> EfModel {
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (idx, spec) in self.nodes.iter().enumerate() {
            for parent in spec.factor.neighbors() {
                children[parent.index()].push(NodeId(idx));
            }
        }
        EfModel {
            variables: self.variables,
            nodes: self.nodes,
            children,
            variable_nodes: self.variable_nodes,
        }
    }

    fn family_of(&self, label: &str, id: NodeId) -> Result<Family> {
        self.nodes
            .get(id.index())
            .map(|n| n.family)
            .ok_or_else(|| unsupported(label, format!("refers to {} which does not exist yet", id)))
    }

    fn expect_family(&self, label: &str, id: NodeId, expected: Family) -> Result<()> {
        let found = self.family_of(label, id)?;
        if found != expected {
            return Err(unsupported(
                label,
                format!("{} must be {} but is {}", id, expected, found),
            ));
        }
        Ok(())
    }

    fn check_factor(&self, label: &str, family: Family, factor: &Factor) -> Result<()> {
        let neighbors = factor.neighbors();
        let roles = match factor {
            Factor::Categorical(f) => {
                f.discrete_parents.len()
                    + f.rows.iter().filter(|r| matches!(r, ProbabilityRow::Node(_))).count()
            }
            Factor::Gaussian(f) => {
                f.discrete_parents.len()
                    + f.continuous_parents.len()
                    + f.rows
                        .iter()
                        .map(|r| {
                            r.intercept.node().is_some() as usize
                                + r.precision.node().is_some() as usize
                                + r.coefficients.iter().filter(|c| c.node().is_some()).count()
                        })
                        .sum::<usize>()
            }
            Factor::DirichletPrior { .. } | Factor::GammaPrior { .. } => 0,
        };
        if roles != neighbors.len() {
            return Err(unsupported(label, "a node appears in more than one role".to_string()));
        }

        match (factor, family) {
            (Factor::Categorical(f), Family::Categorical { states }) if f.states == states => {
                self.check_discrete_parents(label, &f.discrete_parents, f.rows.len())?;
                for row in &f.rows {
                    match row {
                        ProbabilityRow::Fixed(logs) if logs.len() == states => {}
                        ProbabilityRow::Fixed(logs) => {
                            return Err(invalid(label, format!("row of length {} for {} states", logs.len(), states)))
                        }
                        ProbabilityRow::Node(id) => {
                            self.expect_family(label, *id, Family::Dirichlet { categories: states })?
                        }
                    }
                }
                Ok(())
            }
            (Factor::Gaussian(f), Family::Gaussian) => {
                self.check_discrete_parents(label, &f.discrete_parents, f.rows.len())?;
                for id in &f.continuous_parents {
                    self.expect_family(label, *id, Family::Gaussian)?;
                }
                for row in &f.rows {
                    if row.coefficients.len() != f.continuous_parents.len() {
                        return Err(invalid(
                            label,
                            format!(
                                "{} coefficients for {} continuous parents",
                                row.coefficients.len(),
                                f.continuous_parents.len()
                            ),
                        ));
                    }
                    for scalar in std::iter::once(&row.intercept).chain(&row.coefficients) {
                        match scalar {
                            Scalar::Fixed(v) if v.is_finite() => {}
                            Scalar::Fixed(v) => return Err(invalid(label, format!("non-finite parameter {}", v))),
                            Scalar::Node(id) => self.expect_family(label, *id, Family::Gaussian)?,
                        }
                    }
                    match row.precision {
                        Scalar::Fixed(t) if t.is_finite() && t > 0.0 => {}
                        Scalar::Fixed(t) => return Err(invalid(label, format!("precision {} is not positive", t))),
                        Scalar::Node(id) => self.expect_family(label, id, Family::Gamma)?,
                    }
                }
                Ok(())
            }
            (Factor::DirichletPrior { alpha }, Family::Dirichlet { categories })
                if alpha.len() == categories =>
            {
                if alpha.iter().all(|a| a.is_finite() && *a > 0.0) {
                    Ok(())
                } else {
                    Err(invalid(label, "dirichlet concentrations must be positive".to_string()))
                }
            }
            (Factor::GammaPrior { shape, rate }, Family::Gamma) => {
                if shape.is_finite() && rate.is_finite() && *shape > 0.0 && *rate > 0.0 {
                    Ok(())
                } else {
                    Err(invalid(label, "gamma shape and rate must be positive".to_string()))
                }
            }
            _ => Err(unsupported(label, format!("factor does not define a {} node", family))),
        }
    }

    fn check_discrete_parents(&self, label: &str, parents: &[DiscreteParent], rows: usize) -> Result<()> {
        for parent in parents {
            self.expect_family(label, parent.node, Family::Categorical { states: parent.states })?;
        }
        let configs: usize = parents.iter().map(|p| p.states).product();
        if configs != rows {
            return Err(invalid(
                label,
                format!("{} rows for {} parent configurations", rows, configs),
            ));
        }
        Ok(())
    }
}

fn unsupported(label: &str, reason: String) -> Error {
    Error::UnsupportedFamily {
        variable: label.to_string(),
        reason,
    }
}

fn invalid(label: &str, reason: String) -> Error {
    Error::InvalidParameters {
        variable: label.to_string(),
        reason,
    }
}
