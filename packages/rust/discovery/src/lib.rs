//! Document discovery for DealScout.
//!
//! Two halves:
//! - [`DocumentStore`]: the collaborator interface over the watched store,
//!   with [`DriveClient`] as the REST implementation.
//! - Change detection ([`find_candidates`], [`select_candidates`]): which
//!   listed documents are new or updated relative to the high-water mark and
//!   the processed-document ledger.

mod detector;
mod drive;
mod store;

pub use detector::{find_candidates, initial_high_water_mark, select_candidates};
pub use drive::{DriveClient, folder_query};
pub use store::{DocumentStore, ExportFormat};
