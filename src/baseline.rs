//! Baseline management
//!
//! This module maintains the rolling personalized baselines for HRV, RHR and
//! sleep timing. Baselines enable relative interpretation of daily signals.
//!
//! The engine is the only writer of the baseline. Calculators take a
//! [`BaselineSnapshot`] at call time; the snapshot's generation changes only
//! when a load or refresh actually changes the comparison basis, which is what
//! the result caches key their staleness on.

use crate::config::ScoringConfig;
use crate::error::ScoreError;
use crate::normalizer::circular_mean;
use crate::sources::{BaselineStore, HealthDataProvider};
use crate::types::{Baseline, BiomarkerSample, CalibrationStatus, SleepSession};
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Baseline as seen by a calculator, tagged with its generation
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSnapshot {
    pub baseline: Baseline,
    pub generation: u64,
}

/// Owns and refreshes one user's baseline
pub struct BaselineEngine {
    provider: Arc<dyn HealthDataProvider>,
    store: Arc<dyn BaselineStore>,
    config: ScoringConfig,
    state: RwLock<BaselineSnapshot>,
    /// Held for the duration of a refresh
    refresh_gate: Mutex<()>,
    /// Completed refreshes, used to let waiting callers join the one in flight
    refreshes: AtomicU64,
}

impl BaselineEngine {
    pub fn new(
        provider: Arc<dyn HealthDataProvider>,
        store: Arc<dyn BaselineStore>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            state: RwLock::new(BaselineSnapshot {
                baseline: Baseline::default(),
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Current baseline and its generation
    pub async fn snapshot(&self) -> BaselineSnapshot {
        self.state.read().await.clone()
    }

    pub async fn baseline(&self) -> Baseline {
        self.state.read().await.baseline.clone()
    }

    /// Read the persisted baseline into memory.
    ///
    /// An empty store leaves the first-run baseline in place. A store failure
    /// is logged and the engine keeps running on its in-memory baseline.
    pub async fn load(&self) -> Baseline {
        match self.store.load().await {
            Ok(Some(loaded)) => {
                debug!(
                    calibrating = loaded.calibrating,
                    "loaded persisted baseline"
                );
                self.replace(loaded).await
            }
            Ok(None) => {
                debug!("no persisted baseline, starting in calibration");
                self.baseline().await
            }
            Err(e) => {
                warn!(error = %e, "failed to load baseline, continuing in memory");
                self.baseline().await
            }
        }
    }

    /// Whether the baseline should be recomputed at `now`
    pub async fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.read().await;
        let baseline = &state.baseline;
        if baseline.calibrating {
            return true;
        }
        match baseline.last_updated {
            Some(updated) => now - updated > self.config.refresh_interval(),
            None => true,
        }
    }

    /// Recompute the baseline from history and persist it
    pub async fn refresh(&self) -> Baseline {
        self.refresh_at(Utc::now()).await
    }

    /// Recompute the baseline, stamping it with `now`.
    ///
    /// Only one refresh runs at a time. A caller that arrives while another
    /// refresh is in flight, including while it is persisting, waits for it
    /// and returns the baseline that refresh installed instead of starting a
    /// second one. The refresh counter only advances once the save has
    /// finished, just before the gate is released.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Baseline {
        let observed = self.refreshes.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        if self.refreshes.load(Ordering::Acquire) != observed {
            debug!("joined in-flight baseline refresh");
            return self.baseline().await;
        }

        let previous = self.baseline().await;
        let computed = self.compute(&previous, now).await;
        let baseline = self.replace(computed).await;

        info!(
            hrv_ready = baseline.calibration.hrv_ready,
            rhr_ready = baseline.calibration.rhr_ready,
            sleep_ready = baseline.calibration.sleep_ready,
            calibrating = baseline.calibrating,
            "baseline refreshed"
        );

        if let Err(e) = self.store.save(&baseline).await {
            warn!(error = %e, "failed to persist baseline, keeping in-memory copy");
        }

        self.refreshes.fetch_add(1, Ordering::Release);
        baseline
    }

    /// Install a new baseline, bumping the generation if the comparison basis changed
    async fn replace(&self, baseline: Baseline) -> Baseline {
        let mut state = self.state.write().await;
        if !same_basis(&state.baseline, &baseline) {
            state.generation += 1;
        }
        state.baseline = baseline;
        state.baseline.clone()
    }

    async fn compute(&self, previous: &Baseline, now: DateTime<Utc>) -> Baseline {
        let config = &self.config;
        let mut calibration = CalibrationStatus::default();

        let hrv = self
            .fetch("hrv", self.provider.historical_hrv(config.hrv_window_days).await)
            .map(|samples| sample_values(&samples));
        let (hrv_60d_ms, hrv_samples) = match hrv {
            Some(values) => (mean(&values), values.len() as u32),
            None => (previous.hrv_60d_ms, 0),
        };
        calibration.hrv_samples = hrv_samples;
        calibration.hrv_ready = hrv_60d_ms.is_some() && hrv_samples >= config.min_hrv_samples;

        let rhr = self
            .fetch("rhr", self.provider.historical_rhr(config.rhr_window_days).await)
            .map(|samples| sample_values(&samples));
        let (rhr_60d_bpm, rhr_samples) = match rhr {
            Some(values) => (mean(&values), values.len() as u32),
            None => (previous.rhr_60d_bpm, 0),
        };
        calibration.rhr_samples = rhr_samples;
        calibration.rhr_ready = rhr_60d_bpm.is_some() && rhr_samples >= config.min_rhr_samples;

        let sleep = self.fetch(
            "sleep",
            self.provider.historical_sleep(config.sleep_window_days).await,
        );
        let (sleep_duration_14d_minutes, bedtime_14d, wake_14d, sessions) = match sleep {
            Some(sessions) => {
                let sessions: Vec<SleepSession> = sessions
                    .into_iter()
                    .filter(|s| s.time_asleep_minutes.is_finite() && s.time_asleep_minutes > 0.0)
                    .collect();
                let durations: Vec<f64> = sessions.iter().map(|s| s.time_asleep_minutes).collect();
                let bedtimes: Vec<NaiveTime> = sessions.iter().map(|s| s.bedtime.time()).collect();
                let wakes: Vec<NaiveTime> = sessions.iter().map(|s| s.wake_time.time()).collect();
                (
                    mean(&durations),
                    circular_mean(&bedtimes),
                    circular_mean(&wakes),
                    sessions.len() as u32,
                )
            }
            None => (
                previous.sleep_duration_14d_minutes,
                previous.bedtime_14d,
                previous.wake_14d,
                0,
            ),
        };
        calibration.sleep_sessions = sessions;
        calibration.sleep_ready = sleep_duration_14d_minutes.is_some()
            && bedtime_14d.is_some()
            && sessions >= config.min_sleep_sessions;

        Baseline {
            hrv_60d_ms,
            rhr_60d_bpm,
            sleep_duration_14d_minutes,
            bedtime_14d,
            wake_14d,
            calibrating: !calibration.is_complete(),
            calibration,
            last_updated: Some(now),
        }
    }

    /// Unwrap a provider result, degrading failures to "no data this time"
    fn fetch<T>(&self, window: &str, result: Result<T, ScoreError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(window, error = %e, "history fetch failed, window stays calibrating");
                None
            }
        }
    }
}

fn sample_values(samples: &[BiomarkerSample]) -> Vec<f64> {
    samples
        .iter()
        .map(|s| s.value)
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect()
}

/// Calculate the arithmetic mean of a set of values
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Whether two baselines compare today's values identically
fn same_basis(a: &Baseline, b: &Baseline) -> bool {
    a.hrv_60d_ms == b.hrv_60d_ms
        && a.rhr_60d_bpm == b.rhr_60d_bpm
        && a.sleep_duration_14d_minutes == b.sleep_duration_14d_minutes
        && a.bedtime_14d == b.bedtime_14d
        && a.wake_14d == b.wake_14d
        && a.calibration.hrv_ready == b.calibration.hrv_ready
        && a.calibration.rhr_ready == b.calibration.rhr_ready
        && a.calibration.sleep_ready == b.calibration.sleep_ready
}
