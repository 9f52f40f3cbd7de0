//! Period aggregation and alignment.
//!
//! Responsibilities:
//!
//! - map calendar dates to bucket keys (`key`)
//! - sum raw observations per bucket (`aggregate`)
//! - derive the gap-free grid shared by one or two series (`range`)
//! - combine both into a zero-filled, aligned dataset (`dataset`)

pub mod aggregate;
pub mod dataset;
pub mod key;
pub mod range;

pub use aggregate::*;
pub use dataset::*;
pub use key::*;
pub use range::*;
