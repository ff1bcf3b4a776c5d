//! Posterior summaries returned by queries.

use bn_math::{DirichletParams, GammaParams, NormalParams};
use serde::{Deserialize, Serialize};

use crate::expfamily::Family;
use crate::model::Value;

/// Variational posterior of one node in standard parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Posterior {
    Multinomial { probabilities: Vec<f64> },
    Normal { mean: f64, variance: f64 },
    Dirichlet { alpha: Vec<f64> },
    Gamma { shape: f64, rate: f64 },
    /// Pinned by evidence; the posterior is a point mass.
    Observed { value: Value },
}

impl Posterior {
    pub(crate) fn from_natural(family: Family, natural: &[f64]) -> Option<Self> {
        match family {
            Family::Categorical { .. } => Some(Posterior::Multinomial {
                probabilities: family.moments(natural)?,
            }),
            Family::Gaussian => {
                let p = NormalParams::from_natural([*natural.first()?, *natural.get(1)?])?;
                Some(Posterior::Normal {
                    mean: p.mean,
                    variance: p.variance,
                })
            }
            Family::Dirichlet { .. } => {
                let p = DirichletParams::from_natural(natural)?;
                Some(Posterior::Dirichlet { alpha: p.alpha })
            }
            Family::Gamma => {
                let p = GammaParams::from_natural([*natural.first()?, *natural.get(1)?])?;
                Some(Posterior::Gamma {
                    shape: p.shape,
                    rate: p.rate,
                })
            }
        }
    }

    /// Posterior mean for scalar families.
    pub fn mean(&self) -> Option<f64> {
        match self {
            Posterior::Normal { mean, .. } => Some(*mean),
            Posterior::Gamma { shape, rate } => Some(shape / rate),
            Posterior::Observed { value } => value.as_real(),
            _ => None,
        }
    }

    /// State probabilities of a multinomial posterior.
    pub fn probabilities(&self) -> Option<&[f64]> {
        match self {
            Posterior::Multinomial { probabilities } => Some(probabilities),
            _ => None,
        }
    }

    /// Expected probability vector of a Dirichlet posterior.
    pub fn dirichlet_mean(&self) -> Option<Vec<f64>> {
        match self {
            Posterior::Dirichlet { alpha } => {
                let total: f64 = alpha.iter().sum();
                Some(alpha.iter().map(|a| a / total).collect())
            }
            _ => None,
        }
    }

    pub fn to_normal(&self) -> Option<NormalParams> {
        match self {
            Posterior::Normal { mean, variance } => NormalParams::new(*mean, *variance),
            _ => None,
        }
    }

    pub fn to_gamma(&self) -> Option<GammaParams> {
        match self {
            Posterior::Gamma { shape, rate } => GammaParams::new(*shape, *rate),
            _ => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Posterior::Observed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_natural() {
        let normal = NormalParams::new(2.0, 0.5).unwrap();
        let p = Posterior::from_natural(Family::Gaussian, &normal.natural()).unwrap();
        assert!((p.mean().unwrap() - 2.0).abs() < 1e-12);
        assert!((p.to_normal().unwrap().variance - 0.5).abs() < 1e-12);

        let p = Posterior::from_natural(Family::Dirichlet { categories: 2 }, &[1.0, 3.0]).unwrap();
        assert_eq!(p.dirichlet_mean().unwrap(), vec![2.0 / 6.0, 4.0 / 6.0]);

        let p = Posterior::from_natural(Family::Gamma, &[1.0, -2.0]).unwrap();
        assert!((p.mean().unwrap() - 1.0).abs() < 1e-12);

        assert!(Posterior::from_natural(Family::Gaussian, &[0.0, 1.0]).is_none());
    }

    #[test]
    fn test_serde_shape() {
        let p = Posterior::Multinomial {
            probabilities: vec![0.25, 0.75],
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"family":"multinomial","probabilities":[0.25,0.75]}"#);
    }
}
