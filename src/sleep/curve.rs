//! Legacy curve sleep model
//!
//! Continuous scoring kept as a fallback for sessions the point-table model
//! cannot score (no deep/REM breakdown). Every component is a smooth 0-100
//! curve; missing components are dropped and the remaining weights rescaled.

use super::{build_result, SleepScorer};
use crate::error::ScoreError;
use crate::normalizer::{decay_score, minutes_between, smooth_penalty_curve};
use crate::types::{Baseline, ScoreComponent, SleepModel, SleepScoreResult, SleepSession};

const DURATION_WEIGHT: f64 = 0.40;
const DEEP_WEIGHT: f64 = 0.20;
const REM_WEIGHT: f64 = 0.20;
const CONSISTENCY_WEIGHT: f64 = 0.20;

/// Hours asleep scored at 100 at the midpoint of this range
const DURATION_RANGE_HOURS: (f64, f64) = (6.0, 10.0);
/// Deep sleep share (% of time asleep) at or above which no penalty applies
const DEEP_TARGET_PCT: f64 = 20.0;
/// REM share (% of time asleep) at or above which no penalty applies
const REM_TARGET_PCT: f64 = 22.0;
/// Percentage points below target at which a stage score falls to ~37
const STAGE_DECAY_PCT: f64 = 10.0;
/// Bedtime deviation (minutes) at which consistency falls to ~37
const CONSISTENCY_DECAY_MINUTES: f64 = 60.0;

/// Continuous exponential/quadratic sleep scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveScorer;

impl CurveScorer {
    fn stage_pct(minutes: Option<f64>, asleep: f64) -> Option<f64> {
        match minutes {
            Some(m) if asleep > 0.0 => Some(m / asleep * 100.0),
            _ => None,
        }
    }
}

impl SleepScorer for CurveScorer {
    fn model(&self) -> SleepModel {
        SleepModel::Curve
    }

    fn score(
        &self,
        session: &SleepSession,
        baseline: &Baseline,
    ) -> Result<SleepScoreResult, ScoreError> {
        if !(session.time_asleep_minutes.is_finite() && session.time_asleep_minutes > 0.0) {
            return Err(ScoreError::unavailable(session.date, "time asleep"));
        }

        let hours = session.hours_asleep();
        let (range_min, range_max) = DURATION_RANGE_HOURS;

        // (name, weight, 0-100 curve value, raw measurement)
        let mut parts: Vec<(&str, f64, f64, f64)> = vec![(
            "Duration",
            DURATION_WEIGHT,
            smooth_penalty_curve(hours, range_min, range_max),
            hours,
        )];

        if let Some(pct) = Self::stage_pct(session.deep_sleep_minutes, session.time_asleep_minutes) {
            let shortfall = (DEEP_TARGET_PCT - pct).max(0.0);
            parts.push(("Deep Sleep", DEEP_WEIGHT, decay_score(shortfall, STAGE_DECAY_PCT), pct));
        }
        if let Some(pct) = Self::stage_pct(session.rem_sleep_minutes, session.time_asleep_minutes) {
            let shortfall = (REM_TARGET_PCT - pct).max(0.0);
            parts.push(("REM Sleep", REM_WEIGHT, decay_score(shortfall, STAGE_DECAY_PCT), pct));
        }
        if let Some(usual) = baseline.bedtime_14d {
            let deviation = minutes_between(session.bedtime.time(), usual);
            parts.push((
                "Consistency",
                CONSISTENCY_WEIGHT,
                decay_score(deviation, CONSISTENCY_DECAY_MINUTES),
                deviation,
            ));
        }

        let total_weight: f64 = parts.iter().map(|p| p.1).sum();
        let components = parts
            .into_iter()
            .map(|(name, weight, value, raw)| {
                let share = weight / total_weight;
                ScoreComponent::new(name, value * share, 100.0 * share, Some(raw))
            })
            .collect();

        let calibrating = baseline.bedtime_14d.is_none() || !baseline.calibration.sleep_ready;
        Ok(build_result(session, components, self.model(), calibrating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn make_session(asleep: f64, deep: Option<f64>, rem: Option<f64>) -> SleepSession {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        SleepSession {
            date,
            time_in_bed_minutes: asleep + 30.0,
            time_asleep_minutes: asleep,
            deep_sleep_minutes: deep,
            rem_sleep_minutes: rem,
            bedtime: date.pred_opt().unwrap().and_hms_opt(23, 0, 0).unwrap(),
            wake_time: date.and_hms_opt(7, 30, 0).unwrap(),
            sleep_efficiency: None,
            time_to_fall_asleep_minutes: None,
        }
    }

    fn baseline_with_bedtime() -> Baseline {
        Baseline {
            bedtime_14d: NaiveTime::from_hms_opt(23, 0, 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_ideal_night_scores_100() {
        let session = make_session(480.0, Some(110.0), Some(120.0));
        let result = CurveScorer.score(&session, &baseline_with_bedtime()).unwrap();

        assert_eq!(result.final_score, 100);
        assert_eq!(result.model, SleepModel::Curve);
        assert_eq!(result.components.len(), 4);
    }

    #[test]
    fn test_weights_rescaled_without_stages() {
        let session = make_session(480.0, None, None);
        let result = CurveScorer.score(&session, &baseline_with_bedtime()).unwrap();

        let max_total: f64 = result.components.iter().map(|c| c.max_score).sum();
        assert!((max_total - 100.0).abs() < 1e-9);
        assert_eq!(result.components.len(), 2);
        assert_eq!(result.final_score, 100);
    }

    #[test]
    fn test_short_sleep_in_range() {
        let session = make_session(180.0, Some(20.0), Some(20.0));
        let result = CurveScorer.score(&session, &Baseline::default()).unwrap();

        assert!(result.final_score <= 100);
        assert!(result.final_score < 60);
        assert!(result.calibrating);
    }

    #[test]
    fn test_zero_sleep_is_unavailable() {
        let session = make_session(0.0, None, None);
        let result = CurveScorer.score(&session, &Baseline::default());
        assert!(matches!(result, Err(ScoreError::DataUnavailable { .. })));
    }
}
