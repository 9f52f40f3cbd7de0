//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw inputs (`Observation`) and bucketing configuration (`Granularity`)
//! - derived series (`AggregatedSeries`, `CommonRange`, `Dataset`)
//! - analysis windows and the canonical outputs (`CanonicalMetrics`, `LocalizedReport`)

pub mod types;

pub use types::*;
