//! Daily activity counters shown by `dealscout status`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use dealscout_shared::Result;
use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json};

/// Counters for one calendar day (UTC). Reset when the day rolls over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub date: NaiveDate,
    #[serde(default)]
    pub processed_today: u32,
    #[serde(default)]
    pub deals_created: u32,
    #[serde(default)]
    pub drafts_created: u32,
    #[serde(default)]
    pub failed_today: u32,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
}

impl ActivityStats {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            date,
            processed_today: 0,
            deals_created: 0,
            drafts_created: 0,
            failed_today: 0,
            last_check: None,
        }
    }

    /// Zero the counters if `now` falls on a later day. `last_check` survives.
    pub fn roll_to(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.date != today {
            let last_check = self.last_check;
            *self = Self::for_day(today);
            self.last_check = last_check;
        }
    }
}

/// Totals from one cycle, folded into the day's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleDelta {
    pub processed: u32,
    pub deals_created: u32,
    pub drafts_created: u32,
    pub failed: u32,
}

#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Current counters, already rolled to `now`'s day.
    pub fn load(&self, now: DateTime<Utc>) -> Result<ActivityStats> {
        let mut stats = read_json::<ActivityStats>(&self.path)?
            .unwrap_or_else(|| ActivityStats::for_day(now.date_naive()));
        stats.roll_to(now);
        Ok(stats)
    }

    /// Add one cycle's totals and stamp `last_check`.
    pub fn record_cycle(&self, now: DateTime<Utc>, delta: CycleDelta) -> Result<ActivityStats> {
        let mut stats = self.load(now)?;
        stats.processed_today += delta.processed;
        stats.deals_created += delta.deals_created;
        stats.drafts_created += delta.drafts_created;
        stats.failed_today += delta.failed;
        stats.last_check = Some(now);
        write_json(&self.path, &stats)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn counters_accumulate_within_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(&dir.path().join("activity_stats.json"));
        let morning = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();

        store
            .record_cycle(morning, CycleDelta { processed: 2, deals_created: 2, drafts_created: 1, failed: 0 })
            .unwrap();
        let stats = store
            .record_cycle(morning + Duration::hours(3), CycleDelta { processed: 1, failed: 1, ..Default::default() })
            .unwrap();

        assert_eq!(stats.processed_today, 3);
        assert_eq!(stats.deals_created, 2);
        assert_eq!(stats.drafts_created, 1);
        assert_eq!(stats.failed_today, 1);
        assert_eq!(stats.last_check, Some(morning + Duration::hours(3)));
    }

    #[test]
    fn counters_reset_on_new_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(&dir.path().join("activity_stats.json"));
        let day_one = Utc.with_ymd_and_hms(2024, 5, 2, 23, 0, 0).unwrap();
        store
            .record_cycle(day_one, CycleDelta { processed: 4, ..Default::default() })
            .unwrap();

        let next_day = day_one + Duration::hours(2);
        let stats = store.load(next_day).unwrap();
        assert_eq!(stats.date, next_day.date_naive());
        assert_eq!(stats.processed_today, 0);
        assert_eq!(stats.last_check, Some(day_one));
    }
}
