//! Pipeline orchestration
//!
//! This module provides the high-level API: one processor owning the baseline
//! engine and both calculators, producing a daily readiness report.
//!
//! Pipeline stages:
//! 1. BaselineEngine - refresh the baseline when it is stale or calibrating
//! 2. SleepScoreCalculator - score the night ending on the date
//! 3. RecoveryScoreCalculator - score HRV and RHR against baseline plus sleep
//! 4. DirectiveGenerator - attached to the recovery result

use crate::baseline::BaselineEngine;
use crate::config::ScoringConfig;
use crate::error::ScoreError;
use crate::recovery::RecoveryScoreCalculator;
use crate::sleep::SleepScoreCalculator;
use crate::sources::{BaselineStore, HealthDataProvider};
use crate::types::{Baseline, RecoveryScoreResult, SleepScoreResult};
use crate::{PRODUCER_NAME, READINESS_VERSION};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifies the processor that produced a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessProducer {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

/// Everything computed for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReadiness {
    pub date: NaiveDate,
    pub sleep: SleepScoreResult,
    /// Absent when HRV or RHR data is missing for the date
    pub recovery: Option<RecoveryScoreResult>,
    pub directive: Option<String>,
    pub baseline: Baseline,
    pub producer: ReadinessProducer,
}

impl DailyReadiness {
    pub fn to_json(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Stateful processor holding one user's baseline and score caches.
///
/// Use this when scores are requested repeatedly over the life of a process;
/// the baseline is refreshed on demand and results are cached per date.
pub struct ReadinessProcessor {
    engine: Arc<BaselineEngine>,
    sleep: Arc<SleepScoreCalculator>,
    recovery: RecoveryScoreCalculator,
    instance_id: Uuid,
}

impl ReadinessProcessor {
    /// Create a processor, rejecting an invalid configuration
    pub fn new(
        provider: Arc<dyn HealthDataProvider>,
        store: Arc<dyn BaselineStore>,
        config: ScoringConfig,
    ) -> Result<Self, ScoreError> {
        config.validate()?;

        let engine = Arc::new(BaselineEngine::new(provider.clone(), store, config));
        let sleep = Arc::new(SleepScoreCalculator::new(provider.clone(), engine.clone()));
        let recovery = RecoveryScoreCalculator::new(provider, engine.clone(), sleep.clone());

        Ok(Self {
            engine,
            sleep,
            recovery,
            instance_id: Uuid::new_v4(),
        })
    }

    pub fn engine(&self) -> &BaselineEngine {
        &self.engine
    }

    pub fn sleep(&self) -> &SleepScoreCalculator {
        &self.sleep
    }

    pub fn recovery(&self) -> &RecoveryScoreCalculator {
        &self.recovery
    }

    /// Read the persisted baseline, if any
    pub async fn load(&self) -> Baseline {
        self.engine.load().await
    }

    /// Readiness report for `date`, using the wall clock for refresh decisions
    pub async fn daily_report(&self, date: NaiveDate) -> Result<DailyReadiness, ScoreError> {
        self.daily_report_at(date, Utc::now()).await
    }

    /// Readiness report for `date` as of `now`.
    ///
    /// A missing sleep session fails the report. Missing HRV or RHR only
    /// drops the recovery section.
    pub async fn daily_report_at(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyReadiness, ScoreError> {
        if self.engine.should_refresh(now).await {
            self.engine.refresh_at(now).await;
        }

        let sleep = self.sleep.calculate_sleep_score(date).await?;
        let recovery = match self.recovery.calculate_recovery_score(date).await {
            Ok(result) => Some(result),
            Err(ScoreError::DataUnavailable { what, .. }) => {
                debug!(%date, missing = %what, "recovery unavailable");
                None
            }
            Err(e) => return Err(e),
        };
        let directive = recovery.as_ref().map(|r| r.directive.clone());

        info!(
            %date,
            sleep_score = sleep.final_score,
            recovery_score = recovery.as_ref().map(|r| r.final_score),
            "daily readiness computed"
        );

        Ok(DailyReadiness {
            date,
            sleep,
            recovery,
            directive,
            baseline: self.engine.baseline().await,
            producer: ReadinessProducer {
                name: PRODUCER_NAME.to_string(),
                version: READINESS_VERSION.to_string(),
                instance_id: self.instance_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{InMemoryBaselineStore, InMemoryHealthData};
    use crate::types::{BiomarkerKind, BiomarkerSample, SleepSession};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        reference().date_naive()
    }

    fn night(date: NaiveDate) -> SleepSession {
        SleepSession {
            date,
            time_in_bed_minutes: 500.0,
            time_asleep_minutes: 470.0,
            deep_sleep_minutes: Some(90.0),
            rem_sleep_minutes: Some(105.0),
            bedtime: (date - Duration::days(1)).and_hms_opt(22, 50, 0).unwrap(),
            wake_time: date.and_hms_opt(7, 10, 0).unwrap(),
            sleep_efficiency: Some(94.0),
            time_to_fall_asleep_minutes: Some(12.0),
        }
    }

    async fn seeded(days: i64) -> Arc<InMemoryHealthData> {
        let provider = Arc::new(InMemoryHealthData::new().with_reference_time(reference()));
        for i in 1..=days {
            let ts = reference() - Duration::days(i);
            provider
                .add_sample(BiomarkerSample::new(BiomarkerKind::Hrv, 52.0, ts))
                .await;
            provider
                .add_sample(BiomarkerSample::new(BiomarkerKind::Rhr, 57.0, ts))
                .await;
            provider.add_sleep_session(night(ts.date_naive())).await;
        }
        provider
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = ScoringConfig {
            hrv_window_days: 0,
            ..Default::default()
        };
        let result = ReadinessProcessor::new(
            Arc::new(InMemoryHealthData::new()),
            Arc::new(InMemoryBaselineStore::new()),
            config,
        );
        assert!(matches!(result, Err(ScoreError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_daily_report_refreshes_and_persists() {
        let provider = seeded(30).await;
        provider.add_sleep_session(night(today())).await;
        provider
            .add_sample(BiomarkerSample::new(BiomarkerKind::Hrv, 58.0, reference()))
            .await;
        provider
            .add_sample(BiomarkerSample::new(BiomarkerKind::Rhr, 55.0, reference()))
            .await;
        let store = Arc::new(InMemoryBaselineStore::new());

        let processor =
            ReadinessProcessor::new(provider, store.clone(), ScoringConfig::default()).unwrap();
        processor.load().await;
        let report = processor.daily_report_at(today(), reference()).await.unwrap();

        assert!(!report.baseline.calibrating);
        assert_eq!(report.baseline.last_updated, Some(reference()));
        assert_eq!(store.saved().await, Some(report.baseline.clone()));

        let recovery = report.recovery.as_ref().unwrap();
        assert_eq!(report.directive.as_deref(), Some(recovery.directive.as_str()));
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, READINESS_VERSION);
    }

    #[tokio::test]
    async fn test_missing_biomarkers_drop_recovery_only() {
        let provider = seeded(30).await;
        provider.add_sleep_session(night(today())).await;

        let processor = ReadinessProcessor::new(
            provider,
            Arc::new(InMemoryBaselineStore::new()),
            ScoringConfig::default(),
        )
        .unwrap();
        let report = processor.daily_report_at(today(), reference()).await.unwrap();

        assert!(report.recovery.is_none());
        assert!(report.directive.is_none());
        assert!(report.sleep.final_score <= 100);
    }

    #[tokio::test]
    async fn test_missing_sleep_fails_report() {
        let provider = seeded(30).await;
        let processor = ReadinessProcessor::new(
            provider,
            Arc::new(InMemoryBaselineStore::new()),
            ScoringConfig::default(),
        )
        .unwrap();

        let result = processor.daily_report_at(today(), reference()).await;
        assert!(matches!(result, Err(ScoreError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_fresh_baseline_is_not_recomputed() {
        let provider = seeded(30).await;
        provider.add_sleep_session(night(today())).await;
        let processor = ReadinessProcessor::new(
            provider,
            Arc::new(InMemoryBaselineStore::new()),
            ScoringConfig::default(),
        )
        .unwrap();

        processor.daily_report_at(today(), reference()).await.unwrap();
        let generation = processor.engine().snapshot().await.generation;

        let later = reference() + Duration::hours(2);
        processor.daily_report_at(today(), later).await.unwrap();

        assert_eq!(processor.engine().snapshot().await.generation, generation);
        assert_eq!(processor.sleep().cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let provider = seeded(10).await;
        provider.add_sleep_session(night(today())).await;
        let processor = ReadinessProcessor::new(
            provider,
            Arc::new(InMemoryBaselineStore::new()),
            ScoringConfig::default(),
        )
        .unwrap();

        let report = processor.daily_report_at(today(), reference()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["date"], "2024-01-31");
        assert_eq!(value["producer"]["name"], "synheart-readiness");
        assert!(value["recovery"].is_null());
    }
}
