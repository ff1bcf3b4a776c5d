//! Exponential-family representation of a network.
//!
//! Converts conditional distributions into factors over nodes with
//! exponential-family variational posteriors, the form the message
//! passing engine operates on.

pub mod factors;
pub mod families;
pub mod model;

pub use factors::{
    CategoricalFactor, DiscreteParent, Factor, GaussianFactor, GaussianRow, MomentSource,
    ProbabilityRow, Scalar,
};
pub use families::Family;
pub use model::{EfModel, EfModelBuilder, NodeSpec};
