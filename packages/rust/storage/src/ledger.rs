//! Processed-document ledger.
//!
//! A JSON object keyed by document id, loaded fully on open and rewritten
//! whole after every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dealscout_shared::{LedgerEntry, Result};

use crate::atomic::{read_json, write_json};

/// Durable idempotency record: at most one entry per document id.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Load the ledger at `path`. A missing file is an empty ledger; a
    /// corrupt one is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let entries: BTreeMap<String, LedgerEntry> = read_json(path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), entries = entries.len(), "ledger loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn get(&self, document_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(document_id)
    }

    /// Insert or replace the entry for `entry.document_id`, then flush.
    ///
    /// The in-memory map is only updated once the file write succeeds.
    pub fn upsert(&mut self, entry: LedgerEntry) -> Result<()> {
        let mut next = self.entries.clone();
        let replaced = next.insert(entry.document_id.clone(), entry).is_some();
        write_json(&self.path, &next)?;
        self.entries = next;
        tracing::debug!(replaced, entries = self.entries.len(), "ledger flushed");
        Ok(())
    }

    /// Entries ordered by most recent `processed_at` first.
    pub fn recent(&self) -> Vec<&LedgerEntry> {
        let mut all: Vec<&LedgerEntry> = self.entries.values().collect();
        all.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
