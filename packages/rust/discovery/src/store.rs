//! Document-store collaborator interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealscout_shared::{DocumentRef, Result};

/// Formats a document can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    PlainText,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
        }
    }
}

/// Read-only access to the watched document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Supported documents directly inside `folder_id` modified after `modified_since`.
    async fn list_documents(
        &self,
        folder_id: &str,
        modified_since: DateTime<Utc>,
    ) -> Result<Vec<DocumentRef>>;

    /// Structured paragraph tree of a native document, as raw JSON.
    async fn get_document_body(&self, id: &str) -> Result<serde_json::Value>;

    /// Export a native document in another format.
    async fn export_as(&self, id: &str, format: ExportFormat) -> Result<Vec<u8>>;

    /// Raw bytes of an uploaded file (Word exports).
    async fn download(&self, id: &str) -> Result<Vec<u8>>;
}
