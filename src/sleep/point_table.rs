//! Point-table sleep model
//!
//! The canonical sleep score. Each component maps a raw measurement through a
//! discrete table; the table maxima (30 + 25 + 20 + 15 + 10) sum to 100 and
//! the component points are added as-is, with no second weighting pass.

use super::{build_result, SleepScorer};
use crate::error::ScoreError;
use crate::normalizer::{minutes_between, step_lookup, Band, PointTable};
use crate::types::{Baseline, ScoreComponent, SleepModel, SleepScoreResult, SleepSession};

/// Hours asleep → duration points
pub const DURATION_TABLE: PointTable = PointTable {
    name: "Duration",
    bands: &[
        Band::fixed(8.0, 30.0),
        Band::fixed(7.5, 29.0),
        Band::fixed(7.0, 27.0),
        Band::fixed(6.5, 25.0),
        Band::fixed(6.0, 20.0),
        Band::fixed(5.5, 15.0),
        Band::fixed(5.0, 10.0),
        Band::fixed(4.5, 5.0),
    ],
    otherwise: 0.0,
    max_score: 30.0,
};

/// Deep sleep minutes → deep sleep points
pub const DEEP_SLEEP_TABLE: PointTable = PointTable {
    name: "Deep Sleep",
    bands: &[
        Band::fixed(105.0, 25.0),
        Band::fixed(90.0, 22.0),
        Band::fixed(75.0, 18.0),
        Band::fixed(60.0, 14.0),
        Band::fixed(45.0, 8.0),
    ],
    otherwise: 0.0,
    max_score: 25.0,
};

/// REM minutes → REM points; under an hour scores linearly up to 5
pub const REM_SLEEP_TABLE: PointTable = PointTable {
    name: "REM Sleep",
    bands: &[
        Band::fixed(120.0, 20.0),
        Band::fixed(105.0, 18.0),
        Band::fixed(90.0, 16.0),
        Band::fixed(75.0, 13.0),
        Band::fixed(60.0, 10.0),
        Band::linear(0.0, 5.0 / 60.0),
    ],
    otherwise: 0.0,
    max_score: 20.0,
};

/// Efficiency percentage → efficiency points
pub const EFFICIENCY_TABLE: PointTable = PointTable {
    name: "Efficiency",
    bands: &[
        Band::fixed(95.0, 15.0),
        Band::fixed(92.5, 12.0),
        Band::fixed(90.0, 10.0),
        Band::fixed(85.0, 5.0),
    ],
    otherwise: 0.0,
    max_score: 15.0,
};

pub const CONSISTENCY_MAX: f64 = 10.0;

/// Points for a bedtime that deviates `deviation_minutes` from the baseline.
/// One point is lost per 10 minutes; 100 minutes or more scores zero.
pub fn consistency_points(deviation_minutes: f64) -> f64 {
    if deviation_minutes <= 0.0 {
        return CONSISTENCY_MAX;
    }
    (CONSISTENCY_MAX - deviation_minutes / 10.0).max(0.0)
}

/// Canonical discrete sleep scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct PointTableScorer;

impl PointTableScorer {
    fn table_component(table: &PointTable, value: f64) -> ScoreComponent {
        ScoreComponent::new(
            table.name,
            step_lookup(value, table),
            table.max_score,
            Some(value),
        )
    }
}

impl SleepScorer for PointTableScorer {
    fn model(&self) -> SleepModel {
        SleepModel::PointTable
    }

    fn score(
        &self,
        session: &SleepSession,
        baseline: &Baseline,
    ) -> Result<SleepScoreResult, ScoreError> {
        let (deep, rem) = match (session.deep_sleep_minutes, session.rem_sleep_minutes) {
            (Some(deep), Some(rem)) => (deep, rem),
            _ => return Err(ScoreError::unavailable(session.date, "sleep stage data")),
        };

        let consistency = match baseline.bedtime_14d {
            Some(usual) => {
                let deviation = minutes_between(session.bedtime.time(), usual);
                ScoreComponent::new(
                    "Consistency",
                    consistency_points(deviation),
                    CONSISTENCY_MAX,
                    Some(deviation),
                )
            }
            // No usual bedtime yet; nothing to deviate from
            None => ScoreComponent::new("Consistency", CONSISTENCY_MAX, CONSISTENCY_MAX, None),
        };

        let components = vec![
            Self::table_component(&DURATION_TABLE, session.hours_asleep()),
            Self::table_component(&DEEP_SLEEP_TABLE, deep),
            Self::table_component(&REM_SLEEP_TABLE, rem),
            Self::table_component(&EFFICIENCY_TABLE, session.efficiency_pct()),
            consistency,
        ];

        let calibrating = baseline.bedtime_14d.is_none() || !baseline.calibration.sleep_ready;
        Ok(build_result(session, components, self.model(), calibrating))
    }
}
