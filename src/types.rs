//! Core types for the readiness scoring core
//!
//! This module defines the data structures that flow between the data sources,
//! the baseline engine and the score calculators: biomarker samples, sleep
//! sessions, the personalized baseline and the per-day score results.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Biomarker sample type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomarkerKind {
    /// Heart rate variability (ms, RMSSD)
    Hrv,
    /// Resting heart rate (bpm)
    Rhr,
}

impl BiomarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiomarkerKind::Hrv => "hrv",
            BiomarkerKind::Rhr => "rhr",
        }
    }
}

/// A single biomarker reading sourced from the health data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerSample {
    pub kind: BiomarkerKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl BiomarkerSample {
    pub fn new(kind: BiomarkerKind, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            value,
            timestamp,
        }
    }
}

/// One night of sleep, keyed by the calendar day it ends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Date this session is attributed to (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Total time in bed (minutes)
    pub time_in_bed_minutes: f64,
    /// Total time asleep (minutes)
    pub time_asleep_minutes: f64,
    /// Deep sleep duration (minutes), if the device reports stages
    #[serde(default)]
    pub deep_sleep_minutes: Option<f64>,
    /// REM sleep duration (minutes), if the device reports stages
    #[serde(default)]
    pub rem_sleep_minutes: Option<f64>,
    /// Local wall-clock time the user went to bed
    pub bedtime: NaiveDateTime,
    /// Local wall-clock time the user woke up
    pub wake_time: NaiveDateTime,
    /// Measured sleep efficiency (percentage, 0-100)
    #[serde(default)]
    pub sleep_efficiency: Option<f64>,
    /// Sleep latency (minutes)
    #[serde(default)]
    pub time_to_fall_asleep_minutes: Option<f64>,
}

impl SleepSession {
    /// Hours actually asleep
    pub fn hours_asleep(&self) -> f64 {
        self.time_asleep_minutes / 60.0
    }

    /// Whether the session carries a deep/REM stage breakdown
    pub fn has_stage_data(&self) -> bool {
        self.deep_sleep_minutes.is_some() && self.rem_sleep_minutes.is_some()
    }

    /// Sleep efficiency as a percentage.
    ///
    /// Uses the measured value when present, otherwise time asleep over time
    /// in bed.
    pub fn efficiency_pct(&self) -> f64 {
        match self.sleep_efficiency {
            Some(measured) => measured.clamp(0.0, 100.0),
            None if self.time_in_bed_minutes > 0.0 => {
                (self.time_asleep_minutes / self.time_in_bed_minutes * 100.0).clamp(0.0, 100.0)
            }
            None => 0.0,
        }
    }
}

/// Per-window calibration progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub hrv_ready: bool,
    pub rhr_ready: bool,
    pub sleep_ready: bool,
    /// Samples in the HRV window at the last refresh
    pub hrv_samples: u32,
    /// Samples in the RHR window at the last refresh
    pub rhr_samples: u32,
    /// Sessions in the sleep window at the last refresh
    pub sleep_sessions: u32,
}

impl CalibrationStatus {
    pub fn is_complete(&self) -> bool {
        self.hrv_ready && self.rhr_ready && self.sleep_ready
    }
}

/// Personalized rolling baselines used as the comparison basis for today's values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Mean HRV over the trailing HRV window (ms)
    pub hrv_60d_ms: Option<f64>,
    /// Mean resting HR over the trailing RHR window (bpm)
    pub rhr_60d_bpm: Option<f64>,
    /// Mean time asleep over the trailing sleep window (minutes)
    pub sleep_duration_14d_minutes: Option<f64>,
    /// Circular mean bedtime over the trailing sleep window
    pub bedtime_14d: Option<NaiveTime>,
    /// Circular mean wake time over the trailing sleep window
    pub wake_14d: Option<NaiveTime>,
    /// True until every window has reached its minimum sample count
    pub calibrating: bool,
    #[serde(default)]
    pub calibration: CalibrationStatus,
    /// When the baseline was last recomputed; `None` before the first refresh
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            hrv_60d_ms: None,
            rhr_60d_bpm: None,
            sleep_duration_14d_minutes: None,
            bedtime_14d: None,
            wake_14d: None,
            calibrating: true,
            calibration: CalibrationStatus::default(),
            last_updated: None,
        }
    }
}

impl Baseline {
    /// Load a baseline from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the baseline to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One line of a score breakdown ("how this was calculated")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
}

impl ScoreComponent {
    pub fn new(name: &str, score: f64, max_score: f64, current_value: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            score,
            max_score,
            current_value,
        }
    }
}

/// Which sleep model produced a sleep score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepModel {
    /// Canonical discrete point-table model
    PointTable,
    /// Legacy continuous curve model
    Curve,
}

/// Daily sleep score with its component breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepScoreResult {
    pub date: NaiveDate,
    /// Final score (0-100)
    pub final_score: u8,
    pub components: Vec<ScoreComponent>,
    pub time_in_bed_minutes: f64,
    pub time_asleep_minutes: f64,
    pub deep_sleep_minutes: Option<f64>,
    pub rem_sleep_minutes: Option<f64>,
    /// Efficiency used for scoring (percentage, measured or derived)
    pub sleep_efficiency: f64,
    pub time_to_fall_asleep_minutes: Option<f64>,
    pub model: SleepModel,
    /// Computed against a baseline field that is still calibrating
    pub calibrating: bool,
}

/// Daily recovery score with its component breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScoreResult {
    pub date: NaiveDate,
    /// Final score (0-100)
    pub final_score: u8,
    pub hrv_component: ScoreComponent,
    pub rhr_component: ScoreComponent,
    pub sleep_component: ScoreComponent,
    pub directive: String,
    /// Computed against a baseline field that is still calibrating
    pub calibrating: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_session(asleep: f64, in_bed: f64, efficiency: Option<f64>) -> SleepSession {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        SleepSession {
            date,
            time_in_bed_minutes: in_bed,
            time_asleep_minutes: asleep,
            deep_sleep_minutes: Some(90.0),
            rem_sleep_minutes: None,
            bedtime: NaiveDate::from_ymd_opt(2024, 1, 14)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap(),
            wake_time: date.and_hms_opt(7, 0, 0).unwrap(),
            sleep_efficiency: efficiency,
            time_to_fall_asleep_minutes: None,
        }
    }

    #[test]
    fn test_efficiency_derived_from_durations() {
        let session = make_session(420.0, 480.0, None);
        // 420 / 480 = 87.5%
        assert!((session.efficiency_pct() - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_measured_efficiency_wins() {
        let session = make_session(420.0, 480.0, Some(96.0));
        assert_eq!(session.efficiency_pct(), 96.0);
    }

    #[test]
    fn test_stage_data_requires_both_stages() {
        let session = make_session(420.0, 480.0, None);
        assert!(!session.has_stage_data());
    }

    #[test]
    fn test_empty_baseline_is_calibrating() {
        let baseline = Baseline::default();
        assert!(baseline.calibrating);
        assert!(baseline.last_updated.is_none());
        assert!(!baseline.calibration.is_complete());
    }

    #[test]
    fn test_baseline_serialization() {
        let baseline = Baseline {
            hrv_60d_ms: Some(55.0),
            bedtime_14d: NaiveTime::from_hms_opt(23, 15, 0),
            ..Default::default()
        };

        let json = baseline.to_json().unwrap();
        let loaded = Baseline::from_json(&json).unwrap();
        assert_eq!(loaded, baseline);
    }
}
