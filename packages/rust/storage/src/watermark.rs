//! High-water-mark store: the single timestamp bounding the next scan.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dealscout_shared::Result;
use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json};

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    last_check: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// `None` on first run.
    pub fn load(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(read_json::<WatermarkFile>(&self.path)?.map(|f| f.last_check))
    }

    pub fn store(&self, mark: DateTime<Utc>) -> Result<()> {
        write_json(&self.path, &WatermarkFile { last_check: mark })?;
        tracing::debug!(%mark, "high-water mark advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_run_has_no_mark() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(&dir.path().join("last_check.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn stores_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_check.json");
        let mark = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        WatermarkStore::new(&path).store(mark).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("last_check"));
        assert_eq!(WatermarkStore::new(&path).load().unwrap(), Some(mark));
    }
}
