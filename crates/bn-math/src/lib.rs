//! Numerical kernels for variational inference over Bayesian networks.

pub mod math;

pub use math::stable::*;
pub use math::categorical;
pub use math::dirichlet::{self, DirichletParams};
pub use math::gamma::{self, GammaParams};
pub use math::normal::{self, normal_log_pdf, NormalParams};
