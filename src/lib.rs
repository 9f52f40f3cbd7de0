//! `impact-scope` library crate.
//!
//! The binary (`impact`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the period/window/normalization stages are reusable by other front-ends
//! - the statistical engine stays swappable behind `engine::ImpactEngine`

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod period;
pub mod plot;
pub mod report;
pub mod window;
