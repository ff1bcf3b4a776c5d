//! Bayesian networks with parameters.

pub mod assignment;
pub mod distributions;
pub mod layout;
pub mod network;

pub use assignment::{Assignment, Value};
pub use distributions::{ClgRow, ConditionalDistribution};
pub use layout::ParentLayout;
pub use network::BayesianNetwork;
