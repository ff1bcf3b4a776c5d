//! Plate expansion of a DAG over a batch of data instances.
//!
//! Parameter nodes come first so every data copy can refer to them; then
//! every variable is replicated once per instance in topological order.
//! Observed values are pinned in the model, missing ones stay latent.

use bn_common::{Error, NodeId, Result, VariableId};
use bn_config::ParameterPriors;

use crate::dag::SealedDag;
use crate::expfamily::{
    CategoricalFactor, DiscreteParent, EfModel, EfModelBuilder, Factor, Family, GaussianFactor,
    GaussianRow, ProbabilityRow, Scalar,
};
use crate::model::{Assignment, ConditionalDistribution, ParentLayout};
use crate::variables::StateSpace;

/// Regression parameter nodes of one Gaussian row.
#[derive(Debug, Clone)]
pub struct RowNodes {
    pub intercept: NodeId,
    pub coefficients: Vec<NodeId>,
    pub precision: NodeId,
}

/// Shared parameter nodes of one variable.
#[derive(Debug, Clone)]
pub enum ParameterNodes {
    /// One Dirichlet node per parent configuration.
    Multinomial { rows: Vec<NodeId> },
    Gaussian { rows: Vec<RowNodes> },
}

/// A plate model and the handles needed to read parameters back.
#[derive(Debug)]
pub struct Plate {
    pub model: EfModel,
    pub layouts: Vec<ParentLayout>,
    pub parameters: Vec<ParameterNodes>,
    pub instances: usize,
}

impl Plate {
    pub fn build(dag: &SealedDag, data: &[Assignment], priors: &ParameterPriors) -> Result<Self> {
        let variables = dag.variables();
        for instance in data {
            instance.validate(variables)?;
        }

        let mut builder = EfModelBuilder::new(variables.clone());
        let mut layouts = Vec::with_capacity(variables.len());
        let mut parameters: Vec<Option<ParameterNodes>> = vec![None; variables.len()];

        for variable in variables {
            let layout = ParentLayout::from_parents(variables, dag.parent_set(variable.id())?)?;
            // Rejects multinomial children of Gaussian parents.
            ConditionalDistribution::default_for(variable, &layout)?;
            layouts.push(layout);
        }

        for &var in dag.topological_order() {
            let variable = variables.variable(var)?;
            let layout = &layouts[var.index()];
            let name = variable.name();
            let nodes = match variable.state_space() {
                StateSpace::Multinomial { states } => {
                    let rows = (0..layout.configurations())
                        .map(|c| {
                            builder.add_node(
                                format!("theta[{}|{}]", name, c),
                                Family::Dirichlet { categories: states },
                                Factor::DirichletPrior {
                                    alpha: vec![priors.dirichlet_concentration; states],
                                },
                            )
                        })
                        .collect::<Result<Vec<_>>>()?;
                    ParameterNodes::Multinomial { rows }
                }
                StateSpace::Gaussian => {
                    let mut rows = Vec::with_capacity(layout.configurations());
                    for c in 0..layout.configurations() {
                        let intercept = builder.add_node(
                            format!("mu[{}|{}]", name, c),
                            Family::Gaussian,
                            normal_prior(priors),
                        )?;
                        let coefficients = layout
                            .continuous_parents()
                            .iter()
                            .map(|&p| {
                                builder.add_node(
                                    format!("beta[{}|{},{}]", name, c, variables.name_of(p)),
                                    Family::Gaussian,
                                    normal_prior(priors),
                                )
                            })
                            .collect::<Result<Vec<_>>>()?;
                        let precision = builder.add_node(
                            format!("tau[{}|{}]", name, c),
                            Family::Gamma,
                            Factor::GammaPrior {
                                shape: priors.gamma_shape,
                                rate: priors.gamma_rate,
                            },
                        )?;
                        rows.push(RowNodes {
                            intercept,
                            coefficients,
                            precision,
                        });
                    }
                    ParameterNodes::Gaussian { rows }
                }
            };
            parameters[var.index()] = Some(nodes);
        }

        let parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.ok_or_else(|| Error::UnknownVariable(variables.name_of(VariableId(i)))))
            .collect::<Result<Vec<_>>>()?;

        let mut copy_of: Vec<Option<NodeId>> = vec![None; variables.len()];
        for (i, instance) in data.iter().enumerate() {
            copy_of.iter_mut().for_each(|c| *c = None);
            for &var in dag.topological_order() {
                let layout = &layouts[var.index()];
                let lookup = |p: VariableId| {
                    copy_of[p.index()].ok_or_else(|| Error::UnknownVariable(variables.name_of(p)))
                };
                let discrete_parents = layout
                    .multinomial_parents()
                    .iter()
                    .map(|&(p, states)| Ok(DiscreteParent { node: lookup(p)?, states }))
                    .collect::<Result<Vec<_>>>()?;
                let factor = match &parameters[var.index()] {
                    ParameterNodes::Multinomial { rows } => {
                        Factor::Categorical(CategoricalFactor {
                            states: variables.variable(var)?.arity(),
                            discrete_parents,
                            rows: rows.iter().map(|&r| ProbabilityRow::Node(r)).collect(),
                        })
                    }
                    ParameterNodes::Gaussian { rows } => Factor::Gaussian(GaussianFactor {
                        discrete_parents,
                        continuous_parents: layout
                            .continuous_parents()
                            .iter()
                            .map(|&p| lookup(p))
                            .collect::<Result<Vec<_>>>()?,
                        rows: rows
                            .iter()
                            .map(|r| GaussianRow {
                                intercept: Scalar::Node(r.intercept),
                                coefficients: r.coefficients.iter().map(|&b| Scalar::Node(b)).collect(),
                                precision: Scalar::Node(r.precision),
                            })
                            .collect(),
                    }),
                };
                let label = format!("{}#{}", variables.name_of(var), i);
                let id = builder.add_copy_node(var, label, factor)?;
                if let Some(value) = instance.get(var) {
                    builder.observe(id, value)?;
                }
                copy_of[var.index()] = Some(id);
            }
        }

        Ok(Self {
            model: builder.build(),
            layouts,
            parameters,
            instances: data.len(),
        })
    }
}

/// Normal prior over a regression parameter, written as a Gaussian factor
/// with fixed mean and precision.
fn normal_prior(priors: &ParameterPriors) -> Factor {
    Factor::Gaussian(GaussianFactor {
        discrete_parents: Vec::new(),
        continuous_parents: Vec::new(),
        rows: vec![GaussianRow {
            intercept: Scalar::Fixed(priors.normal_mean),
            coefficients: Vec::new(),
            precision: Scalar::Fixed(1.0 / priors.normal_variance),
        }],
    })
}
