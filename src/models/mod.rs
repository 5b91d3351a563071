//! Thermal-wave model implementations.
//!
//! Models are small, pure functions so that fitting/search code can stay generic.

pub mod model;

pub use model::*;
