//! Local JSON state for DealScout.
//!
//! Three files live under the configured data directory, each read fully
//! and rewritten fully on update:
//! - `ledger.json`: processed-document ledger ([`Ledger`])
//! - `last_check.json`: high-water mark ([`WatermarkStore`])
//! - `activity_stats.json`: daily counters ([`StatsStore`])
//!
//! Only the pipeline driver writes these files; a single process is assumed.

mod atomic;
mod ledger;
mod stats;
mod watermark;

use std::path::{Path, PathBuf};

pub use atomic::{read_json, write_json};
pub use ledger::Ledger;
pub use stats::{ActivityStats, CycleDelta, StatsStore};
pub use watermark::WatermarkStore;

const LEDGER_FILE: &str = "ledger.json";
const WATERMARK_FILE: &str = "last_check.json";
const STATS_FILE: &str = "activity_stats.json";

/// File locations under one data directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub ledger: PathBuf,
    pub watermark: PathBuf,
    pub stats: PathBuf,
}

impl StatePaths {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            ledger: data_dir.join(LEDGER_FILE),
            watermark: data_dir.join(WATERMARK_FILE),
            stats: data_dir.join(STATS_FILE),
        }
    }
}
