//! Error types.
//!
//! `ImpactError` is the library-level taxonomy: every pipeline stage returns it.
//! `AppError` is the binary boundary; it only carries an exit code and a message.

use chrono::NaiveDate;
use thiserror::Error;

/// Which window constraint failed, with the offending values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowViolation {
    /// A window field lies before the first bucket of the dataset.
    #[error("{field} {value} is before the first period {min}")]
    BeforeStart { field: &'static str, value: NaiveDate, min: NaiveDate },

    /// A window field lies after the last bucket of the dataset.
    #[error("{field} {value} is after the last period {max}")]
    AfterEnd { field: &'static str, value: NaiveDate, max: NaiveDate },

    /// `post_start <= pre_end`.
    #[error("post-period start {post_start} must be strictly after pre-period end {pre_end}")]
    Overlap { pre_end: NaiveDate, post_start: NaiveDate },

    /// `start > end` inside one of the two periods.
    #[error("{period}-period start {start} is after its end {end}")]
    Reversed { period: &'static str, start: NaiveDate, end: NaiveDate },
}

/// Errors produced by the analysis pipeline.
#[derive(Error, Debug)]
pub enum ImpactError {
    /// Missing/malformed input, or not enough of it.
    #[error("data error: {0}")]
    Data(String),

    /// Two series share no common period.
    #[error(
        "no common period: treated covers {treated_start}..{treated_end}, control covers {control_start}..{control_end}"
    )]
    NoCommonPeriod {
        treated_start: NaiveDate,
        treated_end: NaiveDate,
        control_start: NaiveDate,
        control_end: NaiveDate,
    },

    /// The analysis window is out of bounds or badly ordered.
    #[error("invalid analysis window: {0}")]
    Window(WindowViolation),

    /// Neither extraction strategy produced actual/predicted values.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// The fitting engine failed.
    #[error("engine error: {0}")]
    Engine(String),

    /// The fitting engine did not answer in time.
    #[error("engine did not finish within {0} seconds")]
    EngineTimeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImpactError {
    pub fn data(message: impl Into<String>) -> Self {
        ImpactError::Data(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        ImpactError::Engine(message.into())
    }

    /// Exit code used when the error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ImpactError::Data(_) | ImpactError::Io(_) | ImpactError::Csv(_) | ImpactError::Json(_) => 2,
            ImpactError::NoCommonPeriod { .. } | ImpactError::Window(_) => 3,
            ImpactError::Engine(_) | ImpactError::EngineTimeout(_) => 4,
            ImpactError::Normalization(_) => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ImpactError> for AppError {
    fn from(err: ImpactError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
