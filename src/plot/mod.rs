//! Terminal plots.

pub mod ascii;

pub use ascii::render_impact_plot;
