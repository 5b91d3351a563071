//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - experimental trials (`Trial`, `SurfaceFlag`)
//! - fit inputs/outputs (`FitParameters`, `FitResult`, `FitQuality`)
//! - grid-search seeding policy (`SeedMode`)
//! - the portable fit file (`FitFile`)

pub mod types;

pub use types::*;
