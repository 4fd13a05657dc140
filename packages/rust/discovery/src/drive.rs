//! Drive v3 / Docs v1 REST client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dealscout_shared::{
    DealScoutError, DocumentRef, GoogleConfig, MimeKind, NATIVE_DOC_MIME, Result, WORD_DOC_MIME,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::store::{DocumentStore, ExportFormat};

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("DealScout/", env!("CARGO_PKG_VERSION"));

/// Upper bound on pages followed per listing.
const MAX_LIST_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    created_time: DateTime<Utc>,
    modified_time: DateTime<Utc>,
}

/// Document store backed by the Drive and Docs REST APIs.
pub struct DriveClient {
    client: Client,
    drive_base: String,
    docs_base: String,
    token: String,
    page_size: u32,
}

impl DriveClient {
    pub fn new(config: &GoogleConfig, token: &str, page_size: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            drive_base: config.drive_base_url.trim_end_matches('/').to_string(),
            docs_base: config.docs_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            page_size,
        })
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DealScoutError::Network(format!(
                "{what}: HTTP {status}: {}",
                truncate(&body, 200)
            )));
        }
        Ok(response)
    }

    async fn bytes(&self, request: RequestBuilder, what: &str) -> Result<Vec<u8>> {
        let response = self.send(request, what).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DealScoutError::Network(format!("{what}: failed to read body: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Drive search expression for supported documents in one folder.
pub fn folder_query(folder_id: &str, modified_since: DateTime<Utc>) -> String {
    let folder = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "'{folder}' in parents and trashed = false and \
         (mimeType='{NATIVE_DOC_MIME}' or mimeType='{WORD_DOC_MIME}') and \
         modifiedTime > '{}'",
        modified_since.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

#[async_trait]
impl DocumentStore for DriveClient {
    #[instrument(skip_all, fields(folder = %folder_id, since = %modified_since))]
    async fn list_documents(
        &self,
        folder_id: &str,
        modified_since: DateTime<Utc>,
    ) -> Result<Vec<DocumentRef>> {
        let query = folder_query(folder_id, modified_since);
        let url = format!("{}/files", self.drive_base);
        let page_size = self.page_size.to_string();

        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut params = vec![
                ("q", query.as_str()),
                ("pageSize", page_size.as_str()),
                ("orderBy", "modifiedTime desc"),
                (
                    "fields",
                    "nextPageToken,files(id,name,mimeType,createdTime,modifiedTime)",
                ),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .send(self.client.get(&url).query(&params), "list documents")
                .await?;
            let page: FileList = response
                .json()
                .await
                .map_err(|e| DealScoutError::malformed(format!("file listing: {e}")))?;

            for file in page.files {
                match MimeKind::from_mime(&file.mime_type) {
                    Some(mime_kind) => docs.push(DocumentRef {
                        id: file.id,
                        name: file.name,
                        mime_kind,
                        created_at: file.created_time,
                        modified_at: file.modified_time,
                    }),
                    None => debug!(id = %file.id, mime = %file.mime_type, "skipping unsupported file"),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(docs),
            }
        }

        // The oldest documents are the ones past the last page, and the mark
        // would move beyond them; fail the cycle instead of dropping them.
        warn!(max_pages = MAX_LIST_PAGES, listed = docs.len(), "listing truncated");
        Err(DealScoutError::validation(format!(
            "folder listing exceeded {MAX_LIST_PAGES} pages of {page_size}; raise [watch].page_size"
        )))
    }

    #[instrument(skip(self))]
    async fn get_document_body(&self, id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/documents/{id}", self.docs_base);
        let response = self.send(self.client.get(&url), "get document").await?;
        response
            .json()
            .await
            .map_err(|e| DealScoutError::malformed(format!("document {id}: {e}")))
    }

    #[instrument(skip(self))]
    async fn export_as(&self, id: &str, format: ExportFormat) -> Result<Vec<u8>> {
        let url = format!("{}/files/{id}/export", self.drive_base);
        let request = self.client.get(&url).query(&[("mimeType", format.mime())]);
        self.bytes(request, "export document").await
    }

    #[instrument(skip(self))]
    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{id}", self.drive_base);
        let request = self.client.get(&url).query(&[("alt", "media")]);
        self.bytes(request, "download document").await
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
