//! Run settings from the environment (`.env` supported).
//!
//! Precedence: CLI flag > environment variable > built-in default.

use std::time::Duration;

use crate::engine::{EngineOptions, SummaryShape};
use crate::error::ImpactError;

pub const ENV_CONFIDENCE: &str = "IMPACT_CONFIDENCE";
pub const ENV_DRAWS: &str = "IMPACT_DRAWS";
pub const ENV_SEED: &str = "IMPACT_SEED";
pub const ENV_FIT_TIMEOUT_SECS: &str = "IMPACT_FIT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub confidence: f64,
    pub draws: usize,
    pub seed: u64,
    pub fit_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            draws: 1000,
            seed: 42,
            fit_timeout_secs: None,
        }
    }
}

/// CLI-level overrides; `None` keeps the environment/default value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub confidence: Option<f64>,
    pub draws: Option<usize>,
    pub seed: Option<u64>,
    pub fit_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ImpactError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ImpactError> {
        let defaults = Settings::default();
        let settings = Settings {
            confidence: parse_var(&lookup, ENV_CONFIDENCE)?.unwrap_or(defaults.confidence),
            draws: parse_var(&lookup, ENV_DRAWS)?.unwrap_or(defaults.draws),
            seed: parse_var(&lookup, ENV_SEED)?.unwrap_or(defaults.seed),
            fit_timeout_secs: parse_var(&lookup, ENV_FIT_TIMEOUT_SECS)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_overrides(self, o: Overrides) -> Result<Self, ImpactError> {
        let settings = Settings {
            confidence: o.confidence.unwrap_or(self.confidence),
            draws: o.draws.unwrap_or(self.draws),
            seed: o.seed.unwrap_or(self.seed),
            fit_timeout_secs: o.fit_timeout_secs.or(self.fit_timeout_secs),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ImpactError> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ImpactError::data(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence
            )));
        }
        if self.draws == 0 {
            return Err(ImpactError::data("draws must be positive"));
        }
        Ok(())
    }

    pub fn engine_options(&self, summary_shape: SummaryShape) -> EngineOptions {
        EngineOptions {
            confidence: self.confidence,
            draws: self.draws,
            seed: self.seed,
            summary_shape,
        }
    }

    pub fn fit_timeout(&self) -> Option<Duration> {
        self.fit_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ImpactError> {
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ImpactError::data(format!("invalid value for {key}: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        assert_eq!(Settings::from_lookup(lookup(&[])).unwrap(), Settings::default());
    }

    #[test]
    fn env_values_then_cli_overrides() {
        let s = Settings::from_lookup(lookup(&[(ENV_CONFIDENCE, "0.9"), (ENV_DRAWS, "250"), (ENV_FIT_TIMEOUT_SECS, "30")]))
            .unwrap();
        assert_eq!(s.confidence, 0.9);
        assert_eq!(s.draws, 250);
        assert_eq!(s.fit_timeout(), Some(Duration::from_secs(30)));

        let s = s
            .with_overrides(Overrides {
                confidence: Some(0.8),
                seed: Some(7),
                ..Overrides::default()
            })
            .unwrap();
        assert_eq!((s.confidence, s.draws, s.seed), (0.8, 250, 7));
    }

    #[test]
    fn invalid_values_are_data_errors() {
        assert!(Settings::from_lookup(lookup(&[(ENV_DRAWS, "many")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(ENV_CONFIDENCE, "1.0")])).is_err());
        assert!(Settings::default()
            .with_overrides(Overrides {
                confidence: Some(0.0),
                ..Overrides::default()
            })
            .is_err());
    }
}
