//! Scoring configuration
//!
//! Window lengths, calibration thresholds and fallback switches for the
//! baseline engine and the calculators. Loadable from JSON; every field has a
//! default so partial documents are accepted.

use crate::error::ScoreError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default HRV baseline window in days
pub const DEFAULT_HRV_WINDOW_DAYS: u32 = 60;
/// Default RHR baseline window in days
pub const DEFAULT_RHR_WINDOW_DAYS: u32 = 60;
/// Default sleep baseline window in days
pub const DEFAULT_SLEEP_WINDOW_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub hrv_window_days: u32,
    pub rhr_window_days: u32,
    pub sleep_window_days: u32,
    /// HRV samples needed before the HRV baseline counts as calibrated
    pub min_hrv_samples: u32,
    /// RHR samples needed before the RHR baseline counts as calibrated
    pub min_rhr_samples: u32,
    /// Sleep sessions needed before the sleep baselines count as calibrated
    pub min_sleep_sessions: u32,
    /// Age after which a calibrated baseline is recomputed
    pub refresh_interval_hours: u32,
    /// Score stage-less sessions with the legacy curve model
    pub legacy_sleep_fallback: bool,
    /// Refuse to score against calibrating baseline fields
    pub strict_calibration: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hrv_window_days: DEFAULT_HRV_WINDOW_DAYS,
            rhr_window_days: DEFAULT_RHR_WINDOW_DAYS,
            sleep_window_days: DEFAULT_SLEEP_WINDOW_DAYS,
            min_hrv_samples: 14,
            min_rhr_samples: 14,
            min_sleep_sessions: 7,
            refresh_interval_hours: 24,
            legacy_sleep_fallback: true,
            strict_calibration: false,
        }
    }
}

impl ScoringConfig {
    /// Parse and validate a configuration document
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ScoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        let windows = [
            ("hrv_window_days", self.hrv_window_days),
            ("rhr_window_days", self.rhr_window_days),
            ("sleep_window_days", self.sleep_window_days),
        ];
        for (name, days) in windows {
            if days == 0 {
                return Err(ScoreError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.refresh_interval_hours == 0 {
            return Err(ScoreError::InvalidConfig(
                "refresh_interval_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::hours(self.refresh_interval_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = ScoringConfig::from_json(r#"{"sleep_window_days": 21}"#).unwrap();
        assert_eq!(
            config,
            ScoringConfig {
                sleep_window_days: 21,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = ScoringConfig::from_json(r#"{"hrv_window_days": 0}"#);
        assert!(matches!(result, Err(ScoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let config = ScoringConfig {
            refresh_interval_hours: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json() {
        let result = ScoringConfig::from_json("not json");
        assert!(matches!(result, Err(ScoreError::JsonError(_))));
    }
}
