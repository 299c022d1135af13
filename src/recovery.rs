//! Daily recovery score
//!
//! Recovery weighs today's HRV and resting HR against their rolling baselines
//! and folds in the night's sleep score:
//! - HRV (60%): `100 × (1 + log10(today / baseline))`, clamped to [0, 120]
//! - RHR (25%, inverted): `100 × baseline / today`, clamped to [50, 120]
//! - Sleep (15%): the day's sleep score
//!
//! The weighted sum is clamped to [0, 100] and rounded.

use crate::baseline::BaselineEngine;
use crate::cache::{CacheStats, ScoreCache};
use crate::directive::generate_directive;
use crate::error::ScoreError;
use crate::normalizer::to_final_score;
use crate::sleep::SleepScoreCalculator;
use crate::sources::HealthDataProvider;
use crate::types::{Baseline, RecoveryScoreResult, ScoreComponent};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub const HRV_WEIGHT: f64 = 0.60;
pub const RHR_WEIGHT: f64 = 0.25;
pub const SLEEP_WEIGHT: f64 = 0.15;

const HRV_RAW_RANGE: (f64, f64) = (0.0, 120.0);
const RHR_RAW_RANGE: (f64, f64) = (50.0, 120.0);
/// Raw RHR score used when today's reading or its baseline is missing
const RHR_NEUTRAL_RAW: f64 = 100.0;

/// Clamped raw HRV score (0-120) for today's HRV against its baseline
pub fn hrv_raw_score(hrv_today: f64, hrv_baseline: f64) -> f64 {
    let ratio = hrv_today / hrv_baseline;
    let raw = 100.0 * (1.0 + ratio.log10());
    raw.clamp(HRV_RAW_RANGE.0, HRV_RAW_RANGE.1)
}

/// Clamped raw RHR score (50-120); lower resting HR than usual scores higher
pub fn rhr_raw_score(rhr_today: f64, rhr_baseline: f64) -> f64 {
    let ratio = rhr_baseline / rhr_today;
    (100.0 * ratio).clamp(RHR_RAW_RANGE.0, RHR_RAW_RANGE.1)
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Score one day's recovery from its inputs.
///
/// Pure and deterministic. HRV and its baseline are mandatory; a missing RHR
/// reading or RHR baseline is scored at the neutral ratio and flags the
/// result as calibrating.
pub fn score_recovery(
    date: NaiveDate,
    hrv_today: Option<f64>,
    rhr_today: Option<f64>,
    sleep_score: u8,
    baseline: &Baseline,
) -> Result<RecoveryScoreResult, ScoreError> {
    let hrv_today = usable(hrv_today);
    let rhr_today = usable(rhr_today);

    if hrv_today.is_none() && rhr_today.is_none() {
        return Err(ScoreError::unavailable(date, "HRV or resting HR reading"));
    }
    let hrv = hrv_today.ok_or_else(|| ScoreError::unavailable(date, "HRV reading"))?;
    let hrv_baseline =
        usable(baseline.hrv_60d_ms).ok_or_else(|| ScoreError::unavailable(date, "HRV baseline"))?;

    let hrv_component = ScoreComponent::new(
        "HRV",
        HRV_WEIGHT * hrv_raw_score(hrv, hrv_baseline),
        HRV_WEIGHT * HRV_RAW_RANGE.1,
        Some(hrv),
    );

    let (rhr_raw, rhr_substituted) = match (rhr_today, usable(baseline.rhr_60d_bpm)) {
        (Some(today), Some(usual)) => (rhr_raw_score(today, usual), false),
        _ => (RHR_NEUTRAL_RAW, true),
    };
    let rhr_component = ScoreComponent::new(
        "Resting HR",
        RHR_WEIGHT * rhr_raw,
        RHR_WEIGHT * RHR_RAW_RANGE.1,
        rhr_today,
    );

    let sleep_component = ScoreComponent::new(
        "Sleep",
        SLEEP_WEIGHT * sleep_score as f64,
        SLEEP_WEIGHT * 100.0,
        Some(sleep_score as f64),
    );

    let total = hrv_component.score + rhr_component.score + sleep_component.score;
    let final_score = to_final_score(total);

    let calibration = &baseline.calibration;
    let calibrating = !calibration.hrv_ready || !calibration.rhr_ready || rhr_substituted;

    Ok(RecoveryScoreResult {
        date,
        final_score,
        hrv_component,
        rhr_component,
        sleep_component,
        directive: generate_directive(final_score, sleep_score),
        calibrating,
    })
}

/// Computes and caches daily recovery scores
pub struct RecoveryScoreCalculator {
    provider: Arc<dyn HealthDataProvider>,
    baseline: Arc<BaselineEngine>,
    sleep: Arc<SleepScoreCalculator>,
    strict_calibration: bool,
    cache: ScoreCache<RecoveryScoreResult>,
}

impl RecoveryScoreCalculator {
    pub fn new(
        provider: Arc<dyn HealthDataProvider>,
        baseline: Arc<BaselineEngine>,
        sleep: Arc<SleepScoreCalculator>,
    ) -> Self {
        let strict_calibration = baseline.config().strict_calibration;
        Self {
            provider,
            baseline,
            sleep,
            strict_calibration,
            cache: ScoreCache::new(),
        }
    }

    /// Recovery score for `date`.
    ///
    /// Fails with `DataUnavailable` when HRV (or its baseline) is missing, or
    /// when there is no sleep session to supply the sleep contribution.
    pub async fn calculate_recovery_score(
        &self,
        date: NaiveDate,
    ) -> Result<RecoveryScoreResult, ScoreError> {
        let snapshot = self.baseline.snapshot().await;
        if let Some(cached) = self.cache.get(date, snapshot.generation).await {
            return Ok(cached);
        }

        let hrv = self.provider.latest_hrv(date).await?;
        let rhr = self.provider.latest_rhr(date).await?;
        if hrv.is_none() && rhr.is_none() {
            return Err(ScoreError::unavailable(date, "HRV or resting HR reading"));
        }

        let calibration = &snapshot.baseline.calibration;
        if self.strict_calibration && !calibration.hrv_ready {
            return Err(ScoreError::InsufficientHistory(format!(
                "HRV baseline has {} samples",
                calibration.hrv_samples
            )));
        }

        let sleep = self.sleep.calculate_with_snapshot(date, &snapshot).await?;
        let mut result = score_recovery(date, hrv, rhr, sleep.final_score, &snapshot.baseline)?;
        result.calibrating |= sleep.calibrating;

        debug!(
            %date,
            score = result.final_score,
            sleep_score = sleep.final_score,
            "recovery score computed"
        );

        self.cache
            .insert(date, snapshot.generation, result.clone())
            .await;
        Ok(result)
    }

    pub async fn invalidate(&self, date: NaiveDate) {
        self.cache.invalidate(date).await;
        self.sleep.invalidate(date).await;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
