//! External data sources
//!
//! The scoring core consumes two collaborators it does not own: a provider of
//! biomarker samples and sleep sessions, and a persistence store for the
//! baseline. Both are async traits so implementations can sit on top of a
//! database, a platform health API or plain files.

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileBaselineStore;
pub use memory::{HistoryDocument, InMemoryBaselineStore, InMemoryHealthData};

use crate::error::ScoreError;
use crate::types::{Baseline, BiomarkerSample, SleepSession};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of biomarker samples and sleep sessions
#[async_trait]
pub trait HealthDataProvider: Send + Sync {
    /// Most recent HRV reading (ms) recorded on `date`
    async fn latest_hrv(&self, date: NaiveDate) -> Result<Option<f64>, ScoreError>;

    /// Most recent resting HR reading (bpm) recorded on `date`
    async fn latest_rhr(&self, date: NaiveDate) -> Result<Option<f64>, ScoreError>;

    /// The sleep session attributed to `date`, if any
    async fn sleep_session(&self, date: NaiveDate) -> Result<Option<SleepSession>, ScoreError>;

    /// HRV samples from the trailing `days`
    async fn historical_hrv(&self, days: u32) -> Result<Vec<BiomarkerSample>, ScoreError>;

    /// RHR samples from the trailing `days`
    async fn historical_rhr(&self, days: u32) -> Result<Vec<BiomarkerSample>, ScoreError>;

    /// Sleep sessions from the trailing `days`
    async fn historical_sleep(&self, days: u32) -> Result<Vec<SleepSession>, ScoreError>;
}

/// Persistence for the baseline
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// Read the persisted baseline; `Ok(None)` when nothing has been saved yet
    async fn load(&self) -> Result<Option<Baseline>, ScoreError>;

    /// Persist the baseline, replacing any previous value
    async fn save(&self, baseline: &Baseline) -> Result<(), ScoreError>;
}
