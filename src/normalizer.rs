//! Score normalization
//!
//! Pure helpers shared by the sleep and recovery calculators:
//! - Ordered point tables (step lookups with optional linear bands)
//! - Time-of-day arithmetic that respects the 24h wraparound
//! - Smooth curves used by the legacy sleep model

use chrono::{NaiveTime, Timelike};
use std::f64::consts::TAU;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MINUTES_PER_DAY: f64 = 1_440.0;

/// Lowest value `smooth_penalty_curve` will return
pub const PENALTY_FLOOR: f64 = 20.0;

/// How a band converts a measurement into points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandScore {
    /// Flat number of points for the whole band
    Fixed(f64),
    /// Points proportional to the measurement
    Linear { per_unit: f64 },
}

/// One band of a point table, covering `[lower, next band's lower)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub score: BandScore,
}

impl Band {
    pub const fn fixed(lower: f64, points: f64) -> Self {
        Self {
            lower,
            score: BandScore::Fixed(points),
        }
    }

    pub const fn linear(lower: f64, per_unit: f64) -> Self {
        Self {
            lower,
            score: BandScore::Linear { per_unit },
        }
    }
}

/// Monotonic step function mapping a raw measurement to bounded points.
///
/// Bands are listed from the highest lower edge down. Each band is closed on
/// its lower edge and open on its upper edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointTable {
    pub name: &'static str,
    pub bands: &'static [Band],
    /// Points for values below every band (and for NaN)
    pub otherwise: f64,
    pub max_score: f64,
}

impl PointTable {
    /// Check that points never decrease as the measurement increases
    pub fn is_monotonic(&self) -> bool {
        if !self.bands.windows(2).all(|w| w[0].lower > w[1].lower) {
            return false;
        }

        let ascending: Vec<&Band> = self.bands.iter().rev().collect();
        let mut previous_top = self.otherwise;
        for (i, band) in ascending.iter().enumerate() {
            if let BandScore::Linear { per_unit } = band.score {
                if per_unit < 0.0 {
                    return false;
                }
            }
            if band_points(band, band.lower) < previous_top {
                return false;
            }
            // Highest value reached just below the next band's edge
            previous_top = match ascending.get(i + 1) {
                Some(next) => band_points(band, next.lower),
                None => band_points(band, band.lower),
            };
        }
        true
    }
}

fn band_points(band: &Band, value: f64) -> f64 {
    match band.score {
        BandScore::Fixed(points) => points,
        BandScore::Linear { per_unit } => value * per_unit,
    }
}

/// Look up the points for `value` in an ordered point table.
///
/// Total over all inputs: values under every band, and NaN, resolve to the
/// table's `otherwise` points.
pub fn step_lookup(value: f64, table: &PointTable) -> f64 {
    if value.is_nan() {
        return table.otherwise;
    }

    table
        .bands
        .iter()
        .find(|band| value >= band.lower)
        .map(|band| band_points(band, value).min(table.max_score))
        .unwrap_or(table.otherwise)
}

fn time_to_angle(time: &NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY * TAU
}

/// Mean of a set of times of day on the 24h circle.
///
/// Returns `None` for an empty set, or when the times cancel out and no
/// mean direction exists (e.g. 00:00 and 12:00).
pub fn circular_mean(times: &[NaiveTime]) -> Option<NaiveTime> {
    if times.is_empty() {
        return None;
    }

    let n = times.len() as f64;
    let (sin_sum, cos_sum) = times.iter().map(time_to_angle).fold((0.0, 0.0), |acc, a| {
        (acc.0 + a.sin(), acc.1 + a.cos())
    });
    let (sin_mean, cos_mean) = (sin_sum / n, cos_sum / n);

    if sin_mean.hypot(cos_mean) < 1e-9 {
        return None;
    }

    let angle = sin_mean.atan2(cos_mean).rem_euclid(TAU);
    let seconds = (angle / TAU * SECONDS_PER_DAY).round() as u32 % SECONDS_PER_DAY as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// Distance in minutes between two times of day, going the short way round
/// the clock. Always within `[0, 720]`.
pub fn minutes_between(t1: NaiveTime, t2: NaiveTime) -> f64 {
    let a = t1.num_seconds_from_midnight() as f64 / 60.0;
    let b = t2.num_seconds_from_midnight() as f64 / 60.0;
    let diff = (a - b).abs();
    diff.min(MINUTES_PER_DAY - diff)
}

/// Symmetric quadratic falloff: 100 at the midpoint of `[min, max]`, 50 at the
/// range edges, bottoming out at `PENALTY_FLOOR` further out.
pub fn smooth_penalty_curve(value: f64, min: f64, max: f64) -> f64 {
    let mid = (min + max) / 2.0;
    let half = (max - min) / 2.0;
    if half <= 0.0 {
        return if value == mid { 100.0 } else { PENALTY_FLOOR };
    }

    let t = (value - mid) / half;
    (100.0 - 50.0 * t * t).max(PENALTY_FLOOR)
}

/// Exponential decay from 100 as `distance` grows; `scale` is the distance at
/// which the score has dropped to ~37.
pub fn decay_score(distance: f64, scale: f64) -> f64 {
    if distance <= 0.0 || scale <= 0.0 {
        return 100.0;
    }
    100.0 * (-distance / scale).exp()
}

/// Round and clamp a raw total onto the 0-100 final score scale
pub fn to_final_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
