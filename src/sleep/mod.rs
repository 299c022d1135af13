//! Daily sleep score
//!
//! The calculator scores one night of sleep against the user's baseline.
//! Sessions with a deep/REM breakdown go through the canonical point-table
//! model; sessions without one can fall back to the legacy curve model when
//! the configuration allows it. Results are memoized per date.
//!
//! Pipeline: SleepSession + Baseline → SleepScorer → SleepScoreResult

pub mod curve;
pub mod point_table;

pub use curve::CurveScorer;
pub use point_table::PointTableScorer;

use crate::baseline::{BaselineEngine, BaselineSnapshot};
use crate::cache::{CacheStats, ScoreCache};
use crate::error::ScoreError;
use crate::normalizer::to_final_score;
use crate::sources::HealthDataProvider;
use crate::types::{Baseline, ScoreComponent, SleepModel, SleepScoreResult, SleepSession};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// A model that turns one session into a sleep score
pub trait SleepScorer: Send + Sync {
    fn model(&self) -> SleepModel;

    /// Score a session; synchronous and side-effect free
    fn score(
        &self,
        session: &SleepSession,
        baseline: &Baseline,
    ) -> Result<SleepScoreResult, ScoreError>;
}

/// Assemble a result from its components, summing them into the final score
pub(crate) fn build_result(
    session: &SleepSession,
    components: Vec<ScoreComponent>,
    model: SleepModel,
    calibrating: bool,
) -> SleepScoreResult {
    let total: f64 = components.iter().map(|c| c.score).sum();
    SleepScoreResult {
        date: session.date,
        final_score: to_final_score(total),
        components,
        time_in_bed_minutes: session.time_in_bed_minutes,
        time_asleep_minutes: session.time_asleep_minutes,
        deep_sleep_minutes: session.deep_sleep_minutes,
        rem_sleep_minutes: session.rem_sleep_minutes,
        sleep_efficiency: session.efficiency_pct(),
        time_to_fall_asleep_minutes: session.time_to_fall_asleep_minutes,
        model,
        calibrating,
    }
}

/// Computes and caches daily sleep scores
pub struct SleepScoreCalculator {
    provider: Arc<dyn HealthDataProvider>,
    baseline: Arc<BaselineEngine>,
    primary: PointTableScorer,
    fallback: Option<Box<dyn SleepScorer>>,
    strict_calibration: bool,
    cache: ScoreCache<SleepScoreResult>,
}

impl SleepScoreCalculator {
    /// Create a calculator configured from the engine's scoring config
    pub fn new(provider: Arc<dyn HealthDataProvider>, baseline: Arc<BaselineEngine>) -> Self {
        let config = baseline.config();
        let fallback: Option<Box<dyn SleepScorer>> = if config.legacy_sleep_fallback {
            Some(Box::new(CurveScorer))
        } else {
            None
        };
        let strict_calibration = config.strict_calibration;

        Self {
            provider,
            baseline,
            primary: PointTableScorer,
            fallback,
            strict_calibration,
            cache: ScoreCache::new(),
        }
    }

    /// Replace the fallback model (or remove it with `None`)
    pub fn with_fallback(mut self, fallback: Option<Box<dyn SleepScorer>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sleep score for `date`.
    ///
    /// Fails with `DataUnavailable` when no session is recorded for the date.
    pub async fn calculate_sleep_score(
        &self,
        date: NaiveDate,
    ) -> Result<SleepScoreResult, ScoreError> {
        let snapshot = self.baseline.snapshot().await;
        self.calculate_with_snapshot(date, &snapshot).await
    }

    /// Sleep score for `date` against an already-taken baseline snapshot
    pub(crate) async fn calculate_with_snapshot(
        &self,
        date: NaiveDate,
        snapshot: &BaselineSnapshot,
    ) -> Result<SleepScoreResult, ScoreError> {
        if let Some(cached) = self.cache.get(date, snapshot.generation).await {
            return Ok(cached);
        }

        let session = self
            .provider
            .sleep_session(date)
            .await?
            .ok_or_else(|| ScoreError::unavailable(date, "sleep session"))?;

        let calibration = &snapshot.baseline.calibration;
        if self.strict_calibration && !calibration.sleep_ready {
            return Err(ScoreError::InsufficientHistory(format!(
                "sleep baseline has {} sessions",
                calibration.sleep_sessions
            )));
        }

        let result = self.score_session(&session, &snapshot.baseline)?;
        debug!(
            %date,
            score = result.final_score,
            model = ?result.model,
            "sleep score computed"
        );

        self.cache
            .insert(date, snapshot.generation, result.clone())
            .await;
        Ok(result)
    }

    /// Score a session, routing stage-less sessions to the fallback model
    pub fn score_session(
        &self,
        session: &SleepSession,
        baseline: &Baseline,
    ) -> Result<SleepScoreResult, ScoreError> {
        if session.has_stage_data() {
            return self.primary.score(session, baseline);
        }

        match &self.fallback {
            Some(fallback) => {
                warn!(
                    date = %session.date,
                    "no sleep stage data, scoring with legacy curve model"
                );
                fallback.score(session, baseline)
            }
            None => Err(ScoreError::unavailable(session.date, "sleep stage data")),
        }
    }

    pub async fn invalidate(&self, date: NaiveDate) {
        self.cache.invalidate(date).await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
