//! Error types for Synheart Readiness

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while maintaining baselines or computing scores
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("No {what} available for {date}")]
    DataUnavailable { date: NaiveDate, what: String },

    #[error("Baseline still calibrating: {0}")]
    InsufficientHistory(String),

    #[error("Baseline store failure: {0}")]
    StoreFailure(String),

    #[error("Health data provider failure: {0}")]
    Provider(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScoreError {
    /// Shorthand for a missing input on a given date
    pub fn unavailable(date: NaiveDate, what: impl Into<String>) -> Self {
        ScoreError::DataUnavailable {
            date,
            what: what.into(),
        }
    }

    /// Whether retrying after new data arrives can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ScoreError::InvalidConfig(_) | ScoreError::JsonError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_message() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = ScoreError::unavailable(date, "sleep session");
        assert_eq!(err.to_string(), "No sleep session available for 2024-01-15");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(!ScoreError::InvalidConfig("zero window".to_string()).is_retryable());
        assert!(ScoreError::StoreFailure("disk full".to_string()).is_retryable());
    }
}
