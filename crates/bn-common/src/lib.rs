//! Common types shared across the Bayesian network crates.
//!
//! This crate provides:
//! - Variable, node and run identity types
//! - The shared error taxonomy

pub mod error;
pub mod id;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{NodeId, RunId, VariableId};
