//! `thermal-diffusivity` library crate.
//!
//! The binary (`tdfit`) is a thin wrapper around this library so that:
//!
//! - the series, fitter and grid search are testable without spawning processes
//! - loaders and exporters are reusable from other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
