//! Synheart Readiness - Daily readiness scoring from wearable biomarkers
//!
//! Readiness turns HRV, resting heart rate and sleep sessions into two daily
//! scores and one recommendation through a deterministic pipeline:
//! data provider → baseline computation → sleep score → recovery score
//! → directive.
//!
//! ## Modules
//!
//! - **Baseline**: rolling personalized baselines with calibration tracking
//! - **Sleep**: point-table sleep score, with a legacy curve model fallback
//! - **Recovery**: HRV/RHR/sleep weighted recovery score
//! - **Directive**: fixed recommendation text from the two scores

pub mod baseline;
pub mod cache;
pub mod config;
pub mod directive;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod recovery;
pub mod sleep;
pub mod sources;
pub mod types;

pub use baseline::{BaselineEngine, BaselineSnapshot};
pub use config::ScoringConfig;
pub use directive::{generate_directive, Directive};
pub use error::ScoreError;
pub use pipeline::{DailyReadiness, ReadinessProcessor};
pub use recovery::RecoveryScoreCalculator;
pub use sleep::SleepScoreCalculator;
pub use sources::{BaselineStore, HealthDataProvider};

/// Readiness version embedded in all reports
pub const READINESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-readiness";
