//! One analysis session: raw series in, derived dataset and window out.
//!
//! The session is the single owner of per-analysis state. Derived values are
//! rebuilt, never patched: changing granularity produces a new dataset, and
//! every window change is revalidated against the current dataset.

use crate::domain::{AnalysisWindow, Dataset, Granularity, Observation};
use crate::error::ImpactError;
use crate::period::build;
use crate::window::{InsufficientDataWarning, default_window, validate};

#[derive(Debug, Clone)]
pub struct SessionContext {
    treated: Vec<Observation>,
    control: Option<Vec<Observation>>,
    dataset: Dataset,
    window: Option<ValidatedWindow>,
}

/// A window that passed validation, with its non-blocking warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWindow {
    pub window: AnalysisWindow,
    pub warnings: Vec<InsufficientDataWarning>,
}

impl SessionContext {
    /// Build the dataset for the given series.
    pub fn new(
        treated: Vec<Observation>,
        control: Option<Vec<Observation>>,
        granularity: Granularity,
    ) -> Result<Self, ImpactError> {
        let dataset = build(&treated, control.as_deref(), granularity)?;
        Ok(Self {
            treated,
            control,
            dataset,
            window: None,
        })
    }

    /// Same series at a different granularity. Any window is dropped.
    pub fn regranulate(&self, granularity: Granularity) -> Result<Self, ImpactError> {
        Self::new(self.treated.clone(), self.control.clone(), granularity)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Buckets present in the common range that had no observations.
    pub fn zero_filled(&self) -> usize {
        self.dataset.zero_filled
    }

    pub fn window(&self) -> Option<&ValidatedWindow> {
        self.window.as_ref()
    }

    /// Validate and store `window`. On rejection the previous window is kept.
    pub fn set_window(&mut self, window: AnalysisWindow) -> Result<&ValidatedWindow, ImpactError> {
        let warnings = validate(&window, &self.dataset)?;
        Ok(self.window.insert(ValidatedWindow { window, warnings }))
    }

    /// Validate and store the default window.
    pub fn use_default_window(&mut self) -> Result<&ValidatedWindow, ImpactError> {
        let window = default_window(&self.dataset)?;
        self.set_window(window)
    }
}
