//! In-memory data sources
//!
//! Reference implementations of the source traits, backed by vectors. The
//! health data provider can be seeded from a JSON history document, which is
//! what the CLI feeds it.

use super::{BaselineStore, HealthDataProvider};
use crate::error::ScoreError;
use crate::types::{Baseline, BiomarkerKind, BiomarkerSample, SleepSession};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

/// Serialized health history: biomarker samples and sleep sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryDocument {
    #[serde(default)]
    pub samples: Vec<BiomarkerSample>,
    #[serde(default)]
    pub sleep: Vec<SleepSession>,
    /// "Now" for trailing-window queries; wall clock when absent
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
    /// Offset of the user's local day from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Default)]
struct HistoryData {
    samples: Vec<BiomarkerSample>,
    sleep: Vec<SleepSession>,
}

/// Health data provider holding its history in memory.
///
/// Sleep sessions are keyed by their local calendar date. Sample timestamps
/// are UTC and are assigned to a local day by shifting them by the configured
/// UTC offset (zero by default, i.e. days are UTC days).
#[derive(Debug, Default)]
pub struct InMemoryHealthData {
    data: RwLock<HistoryData>,
    reference_time: Option<DateTime<Utc>>,
    utc_offset_minutes: i32,
}

impl InMemoryHealthData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from a history document.
    ///
    /// At most one session is kept per date; a later entry replaces an
    /// earlier one, as with `add_sleep_session`.
    pub fn from_document(doc: HistoryDocument) -> Self {
        let mut sleep: Vec<SleepSession> = Vec::with_capacity(doc.sleep.len());
        for session in doc.sleep {
            if let Some(pos) = sleep.iter().position(|s| s.date == session.date) {
                warn!(date = %session.date, "duplicate sleep session in history, keeping the later one");
                sleep.remove(pos);
            }
            sleep.push(session);
        }

        Self {
            data: RwLock::new(HistoryData {
                samples: doc.samples,
                sleep,
            }),
            reference_time: doc.reference_time,
            utc_offset_minutes: doc.utc_offset_minutes,
        }
    }

    /// Parse a history document from JSON
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let doc: HistoryDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc))
    }

    /// Pin "now" for trailing-window queries
    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// Shift day boundaries from UTC midnight to local midnight
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Local calendar date of a UTC instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        (instant + Duration::minutes(self.utc_offset_minutes as i64)).date_naive()
    }

    pub async fn add_sample(&self, sample: BiomarkerSample) {
        self.data.write().await.samples.push(sample);
    }

    /// Record a sleep session, replacing any existing session for the same date
    pub async fn add_sleep_session(&self, session: SleepSession) {
        let mut data = self.data.write().await;
        data.sleep.retain(|s| s.date != session.date);
        data.sleep.push(session);
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    async fn latest(&self, kind: BiomarkerKind, date: NaiveDate) -> Option<f64> {
        let data = self.data.read().await;
        data.samples
            .iter()
            .filter(|s| s.kind == kind && self.local_date(s.timestamp) == date)
            .max_by_key(|s| s.timestamp)
            .map(|s| s.value)
    }

    async fn trailing(&self, kind: BiomarkerKind, days: u32) -> Vec<BiomarkerSample> {
        let now = self.now();
        let start = now - Duration::days(days as i64);
        let data = self.data.read().await;
        data.samples
            .iter()
            .filter(|s| s.kind == kind && s.timestamp > start && s.timestamp <= now)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HealthDataProvider for InMemoryHealthData {
    async fn latest_hrv(&self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        Ok(self.latest(BiomarkerKind::Hrv, date).await)
    }

    async fn latest_rhr(&self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        Ok(self.latest(BiomarkerKind::Rhr, date).await)
    }

    async fn sleep_session(&self, date: NaiveDate) -> Result<Option<SleepSession>, ScoreError> {
        let data = self.data.read().await;
        Ok(data.sleep.iter().find(|s| s.date == date).cloned())
    }

    async fn historical_hrv(&self, days: u32) -> Result<Vec<BiomarkerSample>, ScoreError> {
        Ok(self.trailing(BiomarkerKind::Hrv, days).await)
    }

    async fn historical_rhr(&self, days: u32) -> Result<Vec<BiomarkerSample>, ScoreError> {
        Ok(self.trailing(BiomarkerKind::Rhr, days).await)
    }

    async fn historical_sleep(&self, days: u32) -> Result<Vec<SleepSession>, ScoreError> {
        let today = self.local_date(self.now());
        let start = today - Duration::days(days as i64);
        let data = self.data.read().await;
        Ok(data
            .sleep
            .iter()
            .filter(|s| s.date > start && s.date <= today)
            .cloned()
            .collect())
    }
}

/// Baseline store that only lives as long as the process
#[derive(Debug, Default)]
pub struct InMemoryBaselineStore {
    baseline: RwLock<Option<Baseline>>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-persisted baseline
    pub fn with_baseline(baseline: Baseline) -> Self {
        Self {
            baseline: RwLock::new(Some(baseline)),
        }
    }

    /// The last saved baseline
    pub async fn saved(&self) -> Option<Baseline> {
        self.baseline.read().await.clone()
    }
}

#[async_trait]
impl BaselineStore for InMemoryBaselineStore {
    async fn load(&self) -> Result<Option<Baseline>, ScoreError> {
        Ok(self.baseline.read().await.clone())
    }

    async fn save(&self, baseline: &Baseline) -> Result<(), ScoreError> {
        *self.baseline.write().await = Some(baseline.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn sample(kind: BiomarkerKind, value: f64, days_ago: i64) -> BiomarkerSample {
        BiomarkerSample::new(kind, value, reference() - Duration::days(days_ago))
    }

    #[tokio::test]
    async fn test_trailing_window_filter() {
        let provider = InMemoryHealthData::new().with_reference_time(reference());
        provider.add_sample(sample(BiomarkerKind::Hrv, 50.0, 1)).await;
        provider.add_sample(sample(BiomarkerKind::Hrv, 60.0, 10)).await;
        provider.add_sample(sample(BiomarkerKind::Hrv, 70.0, 90)).await;
        provider.add_sample(sample(BiomarkerKind::Rhr, 55.0, 1)).await;

        let hrv = provider.historical_hrv(60).await.unwrap();
        assert_eq!(hrv.len(), 2);
        assert!(hrv.iter().all(|s| s.kind == BiomarkerKind::Hrv));
    }

    #[tokio::test]
    async fn test_latest_reading_for_date() {
        let provider = InMemoryHealthData::new().with_reference_time(reference());
        let day = reference().date_naive();
        provider
            .add_sample(BiomarkerSample::new(BiomarkerKind::Rhr, 58.0, reference()))
            .await;
        provider
            .add_sample(BiomarkerSample::new(
                BiomarkerKind::Rhr,
                54.0,
                reference() + Duration::hours(2),
            ))
            .await;

        assert_eq!(provider.latest_rhr(day).await.unwrap(), Some(54.0));
        assert_eq!(provider.latest_hrv(day).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_from_json_document() {
        let json = r#"{
            "samples": [
                {"kind": "hrv", "value": 62.0, "timestamp": "2024-03-01T06:30:00Z"}
            ],
            "sleep": [{
                "date": "2024-03-01",
                "time_in_bed_minutes": 480.0,
                "time_asleep_minutes": 450.0,
                "deep_sleep_minutes": 95.0,
                "rem_sleep_minutes": 110.0,
                "bedtime": "2024-02-29T22:45:00",
                "wake_time": "2024-03-01T06:45:00"
            }],
            "reference_time": "2024-03-01T08:00:00Z"
        }"#;

        let provider = InMemoryHealthData::from_json(json).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(provider.latest_hrv(day).await.unwrap(), Some(62.0));

        let session = provider.sleep_session(day).await.unwrap().unwrap();
        assert_eq!(session.time_asleep_minutes, 450.0);
        assert_eq!(session.sleep_efficiency, None);
        assert_eq!(provider.historical_sleep(14).await.unwrap().len(), 1);
    }

    fn night(date: &str, asleep: f64) -> String {
        format!(
            r#"{{"date": "{date}", "time_in_bed_minutes": {bed}, "time_asleep_minutes": {asleep},
                "bedtime": "2024-02-29T23:00:00", "wake_time": "{date}T07:00:00"}}"#,
            bed = asleep + 30.0
        )
    }

    #[tokio::test]
    async fn test_document_keeps_one_session_per_day() {
        let json = format!(
            r#"{{"sleep": [{}, {}, {}], "reference_time": "2024-03-01T08:00:00Z"}}"#,
            night("2024-03-01", 300.0),
            night("2024-02-29", 420.0),
            night("2024-03-01", 480.0),
        );

        let provider = InMemoryHealthData::from_json(&json).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let window = provider.historical_sleep(14).await.unwrap();
        assert_eq!(window.iter().filter(|s| s.date == day).count(), 1);
        assert_eq!(window.len(), 2);

        let session = provider.sleep_session(day).await.unwrap().unwrap();
        assert_eq!(session.time_asleep_minutes, 480.0);
    }

    #[tokio::test]
    async fn test_utc_offset_moves_day_boundary() {
        // 2024-03-01 02:30 UTC is the evening of 2024-02-29 in UTC-05:00
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap();
        let local = InMemoryHealthData::new()
            .with_reference_time(reference())
            .with_utc_offset_minutes(-300);
        local
            .add_sample(BiomarkerSample::new(BiomarkerKind::Hrv, 61.0, evening))
            .await;

        let feb_29 = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mar_1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(local.latest_hrv(feb_29).await.unwrap(), Some(61.0));
        assert_eq!(local.latest_hrv(mar_1).await.unwrap(), None);

        let utc = InMemoryHealthData::new().with_reference_time(reference());
        utc.add_sample(BiomarkerSample::new(BiomarkerKind::Hrv, 61.0, evening))
            .await;
        assert_eq!(utc.latest_hrv(mar_1).await.unwrap(), Some(61.0));
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryBaselineStore::new();
        assert!(store.load().await.unwrap().is_none());

        let baseline = Baseline {
            hrv_60d_ms: Some(58.0),
            ..Default::default()
        };
        store.save(&baseline).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(baseline));
    }
}
