//! Conditional distributions of a variable given its parents.
//!
//! Each distribution keeps one row per configuration of the multinomial
//! parents (see [`ParentLayout`]). Which kind is valid follows from the
//! variable type and its parent types:
//!
//! | child       | continuous parents | kind                         |
//! |-------------|--------------------|------------------------------|
//! | multinomial | none               | `Multinomial`                |
//! | gaussian    | none               | `Normal`                     |
//! | gaussian    | some               | `ConditionalLinearGaussian`  |
//!
//! A multinomial child with a Gaussian parent has no representation.

use bn_common::{Error, Result};
use bn_math::{normal_log_pdf, NormalParams};
use serde::{Deserialize, Serialize};

use crate::model::assignment::{Assignment, Value};
use crate::model::layout::ParentLayout;
use crate::variables::{StateSpace, Variable};

/// Tolerance for probability rows summing to one.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Linear-Gaussian regression for one parent configuration:
/// `x ~ N(intercept + Σ coefficients_j · y_j, variance)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClgRow {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub variance: f64,
}

impl ClgRow {
    pub fn mean(&self, continuous_parents: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(continuous_parents)
                .map(|(b, y)| b * y)
                .sum::<f64>()
    }
}

/// Parameters of `p(x | parents)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionalDistribution {
    /// Probability table; `rows[config][state]`.
    Multinomial { rows: Vec<Vec<f64>> },
    /// Normal per configuration.
    Normal { rows: Vec<NormalParams> },
    /// Linear-Gaussian per configuration.
    ConditionalLinearGaussian { rows: Vec<ClgRow> },
}

impl ConditionalDistribution {
    /// Uniform tables, standard normals or zero-coefficient regressions.
    pub fn default_for(variable: &Variable, layout: &ParentLayout) -> Result<Self> {
        let configs = layout.configurations();
        match variable.state_space() {
            StateSpace::Multinomial { states } => {
                if layout.has_continuous_parents() {
                    return Err(unsupported(
                        variable,
                        "a multinomial variable cannot depend on gaussian parents",
                    ));
                }
                Ok(Self::Multinomial {
                    rows: vec![vec![1.0 / states as f64; states]; configs],
                })
            }
            StateSpace::Gaussian if layout.has_continuous_parents() => {
                Ok(Self::ConditionalLinearGaussian {
                    rows: vec![
                        ClgRow {
                            intercept: 0.0,
                            coefficients: vec![0.0; layout.continuous_parents().len()],
                            variance: 1.0,
                        };
                        configs
                    ],
                })
            }
            StateSpace::Gaussian => Ok(Self::Normal {
                rows: vec![
                    NormalParams {
                        mean: 0.0,
                        variance: 1.0,
                    };
                    configs
                ],
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Multinomial { .. } => "multinomial",
            Self::Normal { .. } => "normal",
            Self::ConditionalLinearGaussian { .. } => "conditional_linear_gaussian",
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Self::Multinomial { rows } => rows.len(),
            Self::Normal { rows } => rows.len(),
            Self::ConditionalLinearGaussian { rows } => rows.len(),
        }
    }

    /// Check kind, shape and parameter domains for `variable` with `layout`.
    pub fn validate(&self, variable: &Variable, layout: &ParentLayout) -> Result<()> {
        let expected = Self::default_for(variable, layout)?;
        if std::mem::discriminant(self) != std::mem::discriminant(&expected) {
            return Err(unsupported(
                variable,
                &format!(
                    "expected a {} distribution for these parents, got {}",
                    expected.kind_name(),
                    self.kind_name()
                ),
            ));
        }
        if self.rows() != layout.configurations() {
            return Err(invalid(
                variable,
                format!(
                    "{} rows for {} parent configurations",
                    self.rows(),
                    layout.configurations()
                ),
            ));
        }

        match self {
            Self::Multinomial { rows } => {
                let states = variable.arity();
                for (c, row) in rows.iter().enumerate() {
                    if row.len() != states {
                        return Err(invalid(
                            variable,
                            format!("row {} has {} entries, expected {}", c, row.len(), states),
                        ));
                    }
                    if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(invalid(variable, format!("row {} has a negative or non-finite entry", c)));
                    }
                    let sum: f64 = row.iter().sum();
                    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                        return Err(invalid(variable, format!("row {} sums to {}", c, sum)));
                    }
                }
            }
            Self::Normal { rows } => {
                for (c, row) in rows.iter().enumerate() {
                    check_normal(variable, c, row.mean, row.variance)?;
                }
            }
            Self::ConditionalLinearGaussian { rows } => {
                let k = layout.continuous_parents().len();
                for (c, row) in rows.iter().enumerate() {
                    check_normal(variable, c, row.intercept, row.variance)?;
                    if row.coefficients.len() != k {
                        return Err(invalid(
                            variable,
                            format!("row {} has {} coefficients for {} continuous parents", c, row.coefficients.len(), k),
                        ));
                    }
                    if row.coefficients.iter().any(|b| !b.is_finite()) {
                        return Err(invalid(variable, format!("row {} has a non-finite coefficient", c)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Same kind and shape, and every parameter within `tolerance`.
    pub fn equal_dist(&self, other: &Self, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
        match (self, other) {
            (Self::Multinomial { rows: a }, Self::Multinomial { rows: b }) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(ra, rb)| {
                        ra.len() == rb.len() && ra.iter().zip(rb).all(|(x, y)| close(*x, *y))
                    })
            }
            (Self::Normal { rows: a }, Self::Normal { rows: b }) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| close(x.mean, y.mean) && close(x.variance, y.variance))
            }
            (
                Self::ConditionalLinearGaussian { rows: a },
                Self::ConditionalLinearGaussian { rows: b },
            ) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| {
                        close(x.intercept, y.intercept)
                            && close(x.variance, y.variance)
                            && x.coefficients.len() == y.coefficients.len()
                            && x.coefficients
                                .iter()
                                .zip(&y.coefficients)
                                .all(|(p, q)| close(*p, *q))
                    })
            }
            _ => false,
        }
    }

    /// Log density (or mass) of `value` under row `config`, with the
    /// continuous parents' values in layout order.
    pub fn log_probability(&self, config: usize, value: Value, continuous: &[f64]) -> Option<f64> {
        match (self, value) {
            (Self::Multinomial { rows }, Value::State(s)) => {
                rows.get(config)?.get(s).map(|p| p.ln())
            }
            (Self::Normal { rows }, Value::Real(x)) => {
                let row = rows.get(config)?;
                Some(normal_log_pdf(x, row.mean, row.variance))
            }
            (Self::ConditionalLinearGaussian { rows }, Value::Real(x)) => {
                let row = rows.get(config)?;
                if row.coefficients.len() != continuous.len() {
                    return None;
                }
                Some(normal_log_pdf(x, row.mean(continuous), row.variance))
            }
            _ => None,
        }
    }

    /// Log probability of the child's value in a complete assignment.
    pub(crate) fn log_probability_in(
        &self,
        variable: &Variable,
        layout: &ParentLayout,
        assignment: &Assignment,
    ) -> Option<f64> {
        let value = assignment.get(variable.id())?;
        let config = layout.configuration_of(assignment)?;
        let continuous = layout
            .continuous_parents()
            .iter()
            .map(|p| assignment.get(*p).and_then(|v| v.as_real()))
            .collect::<Option<Vec<_>>>()?;
        self.log_probability(config, value, &continuous)
    }
}

fn check_normal(variable: &Variable, row: usize, mean: f64, variance: f64) -> Result<()> {
    if NormalParams::new(mean, variance).is_none() {
        return Err(invalid(
            variable,
            format!("row {} has mean {} and variance {}", row, mean, variance),
        ));
    }
    Ok(())
}

fn unsupported(variable: &Variable, reason: &str) -> Error {
    Error::UnsupportedFamily {
        variable: variable.name().to_string(),
        reason: reason.to_string(),
    }
}

fn invalid(variable: &Variable, reason: String) -> Error {
    Error::InvalidParameters {
        variable: variable.name().to_string(),
        reason,
    }
}
