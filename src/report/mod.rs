//! Reporting: canonical metrics, narrative translation, detail rows, and
//! formatted terminal output.

pub mod detail;
pub mod format;
pub mod normalize;
pub mod translate;

pub use detail::{DetailRow, detail_rows};
pub use normalize::{normalize, normalize_text};
pub use translate::{translate, translate_text};
