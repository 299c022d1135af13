//! JSON file baseline store

use super::BaselineStore;
use crate::error::ScoreError;
use crate::types::Baseline;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persists the baseline as a single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileBaselineStore {
    path: PathBuf,
}

impl JsonFileBaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BaselineStore for JsonFileBaselineStore {
    async fn load(&self) -> Result<Option<Baseline>, ScoreError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScoreError::StoreFailure(format!(
                    "reading {}: {e}",
                    self.path.display()
                )))
            }
        };

        if json.trim().is_empty() {
            return Ok(None);
        }

        Baseline::from_json(&json).map(Some).map_err(|e| {
            ScoreError::StoreFailure(format!("parsing {}: {e}", self.path.display()))
        })
    }

    async fn save(&self, baseline: &Baseline) -> Result<(), ScoreError> {
        let json = baseline
            .to_json()
            .map_err(|e| ScoreError::StoreFailure(e.to_string()))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            ScoreError::StoreFailure(format!("writing {}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBaselineStore::new(dir.path().join("baseline.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBaselineStore::new(dir.path().join("baseline.json"));

        let baseline = Baseline {
            rhr_60d_bpm: Some(52.5),
            calibrating: false,
            ..Default::default()
        };
        store.save(&baseline).await.unwrap();

        let reopened = JsonFileBaselineStore::new(store.path());
        assert_eq!(reopened.load().await.unwrap(), Some(baseline));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileBaselineStore::new(path).load().await;
        assert!(matches!(result, Err(ScoreError::StoreFailure(_))));
    }

    #[tokio::test]
    async fn test_unwritable_path_is_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBaselineStore::new(dir.path().join("missing").join("baseline.json"));

        let result = store.save(&Baseline::default()).await;
        assert!(matches!(result, Err(ScoreError::StoreFailure(_))));
    }
}
