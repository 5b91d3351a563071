//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit the ber₀ model to one trial with Levenberg–Marquardt (`fitter`)
//! - generate seed grids (`seed_grid`)
//! - search the grid for the seed with the smallest amplitude error (`search`)

pub mod fitter;
pub mod search;
pub mod seed_grid;

pub use fitter::*;
pub use search::*;
pub use seed_grid::*;
