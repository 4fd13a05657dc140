//! Change detection: which documents are new or updated since the last check.

use chrono::{DateTime, Duration, Utc};
use dealscout_shared::{DocumentRef, Result};
use dealscout_storage::Ledger;
use tracing::{debug, info, instrument};

use crate::store::DocumentStore;

/// Default mark for a first-ever run: `now` minus the lookback window.
pub fn initial_high_water_mark(now: DateTime<Utc>, lookback_minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(lookback_minutes.max(0))
}

/// Filter and order a listing against the mark and the ledger.
///
/// A document qualifies when `modified_at` is strictly after the mark and it
/// is either absent from the ledger or modified after it was last recorded.
/// The result is most-recently-modified first, ties broken by id.
pub fn select_candidates(
    listed: Vec<DocumentRef>,
    high_water_mark: DateTime<Utc>,
    ledger: &Ledger,
) -> Vec<DocumentRef> {
    let mut selected: Vec<DocumentRef> = listed
        .into_iter()
        .filter(|doc| doc.modified_at > high_water_mark)
        .filter(|doc| match ledger.get(&doc.id) {
            None => true,
            Some(entry) if doc.modified_at > entry.processed_at => {
                debug!(id = %doc.id, "modified since last processed, treating as update");
                true
            }
            Some(_) => false,
        })
        .collect();

    selected.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    selected
}

/// Query the store and apply [`select_candidates`]. Read-only.
#[instrument(skip_all, fields(folder = %folder_id, mark = %high_water_mark))]
pub async fn find_candidates(
    store: &dyn DocumentStore,
    folder_id: &str,
    high_water_mark: DateTime<Utc>,
    ledger: &Ledger,
) -> Result<Vec<DocumentRef>> {
    let listed = store.list_documents(folder_id, high_water_mark).await?;
    let total = listed.len();
    let candidates = select_candidates(listed, high_water_mark, ledger);
    info!(listed = total, candidates = candidates.len(), "change detection complete");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dealscout_shared::{LedgerEntry, MimeKind};

    fn mark() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn doc(id: &str, modified_at: DateTime<Utc>) -> DocumentRef {
        DocumentRef {
            id: id.into(),
            name: format!("{id} notes"),
            mime_kind: MimeKind::NativeDoc,
            created_at: modified_at,
            modified_at,
        }
    }

    fn recorded(id: &str, processed_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            document_id: id.into(),
            document_name: format!("{id} notes"),
            founder_name: "Jane".into(),
            company_name: None,
            deal_name: None,
            organization_id: None,
            derived_deal_id: None,
            derived_draft_id: None,
            processed_at,
        }
    }

    fn empty_ledger(dir: &tempfile::TempDir) -> Ledger {
        Ledger::open(&dir.path().join("ledger.json")).unwrap()
    }

    #[test]
    fn boundary_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(&dir);
        let listed = vec![
            doc("at-mark", mark()),
            doc("after-mark", mark() + Duration::seconds(1)),
        ];
        let ids: Vec<_> = select_candidates(listed, mark(), &ledger)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["after-mark"]);
    }

    #[test]
    fn recorded_documents_only_return_when_modified_later() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = empty_ledger(&dir);
        let processed = mark() + Duration::minutes(10);
        ledger.upsert(recorded("unchanged", processed)).unwrap();
        ledger.upsert(recorded("edited", processed)).unwrap();

        let listed = vec![
            doc("unchanged", mark() + Duration::minutes(5)),
            doc("edited", processed + Duration::minutes(1)),
            doc("fresh", mark() + Duration::minutes(2)),
        ];
        let ids: Vec<_> = select_candidates(listed, mark(), &ledger)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["edited", "fresh"]);
    }

    #[test]
    fn ordering_is_newest_first_then_id() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(&dir);
        let t = mark() + Duration::minutes(1);
        let listed = vec![
            doc("b", t),
            doc("c", t + Duration::minutes(5)),
            doc("a", t),
        ];
        let ids: Vec<_> = select_candidates(listed, mark(), &ledger)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn first_run_mark_uses_lookback() {
        let now = mark();
        assert_eq!(initial_high_water_mark(now, 60), now - Duration::hours(1));
        assert_eq!(initial_high_water_mark(now, -5), now);
    }
}
