//! Core math modules.

pub mod stable;
pub mod categorical;
pub mod dirichlet;
pub mod gamma;
pub mod normal;
