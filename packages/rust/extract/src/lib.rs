//! Content extraction: raw document body to plain text plus tagged
//! mail-links.
//!
//! Passes run in a fixed fallback order and stop at the first one that finds
//! any address:
//! 1. native paragraph tree ([`NativeDocument`])
//! 2. HTML export ([`scan_html`])
//! 3. bare-address regex over plain text ([`scan_plain`])
//!
//! Word uploads skip the native pass: they are converted to HTML with
//! pandoc first. The title hint is computed independently of all passes.

mod email;
mod html;
mod native;
mod plain;
mod section;
mod title;
mod word;

use dealscout_discovery::{DocumentStore, ExportFormat};
use dealscout_shared::{
    DocumentRef, ExtractedEmail, LinkSource, MimeKind, PolicyConfig, RawExtraction, Result,
};
use tracing::{debug, info, instrument, warn};

pub use email::{domain, find_bare_emails, local_part, parse_mailto};
pub use html::scan_html;
pub use native::{NativeDocument, Paragraph, StructuralElement, TextRun};
pub use plain::scan_plain;
pub use section::{MarkerMatch, Section, SectionTracker};
pub use title::{TitlePattern, TitlePatternRegistry, looks_like_company, looks_like_person};
pub use word::docx_to_html;

/// Output of a single extraction pass.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub plain_text: String,
    pub emails: Vec<ExtractedEmail>,
}

/// A document body already in hand, for offline extraction.
#[derive(Debug, Clone)]
pub enum LocalBody {
    Native(serde_json::Value),
    Html(String),
    PlainText(String),
}

/// Runs the extraction passes for one document at a time.
pub struct ContentExtractor {
    titles: TitlePatternRegistry,
    pandoc_cmd: String,
}

impl ContentExtractor {
    pub fn new(policy: &PolicyConfig, pandoc_cmd: &str) -> Result<Self> {
        Ok(Self {
            titles: TitlePatternRegistry::new(policy.principal_first_name())?,
            pandoc_cmd: pandoc_cmd.to_string(),
        })
    }

    /// Fetch what is needed from `store` and extract.
    ///
    /// Exports are only requested when the earlier pass found no address.
    #[instrument(skip_all, fields(doc_id = %doc.id))]
    pub async fn extract(
        &self,
        store: &dyn DocumentStore,
        doc: &DocumentRef,
    ) -> Result<RawExtraction> {
        let (scan, source) = match doc.mime_kind {
            MimeKind::NativeDoc => self.extract_native(store, doc).await?,
            MimeKind::WordExport => {
                let bytes = store.download(&doc.id).await?;
                let html = docx_to_html(&self.pandoc_cmd, &bytes).await?;
                let scan = scan_html(&html);
                if scan.emails.is_empty() {
                    self.plain_fallback(scan.plain_text)
                } else {
                    (scan, LinkSource::HtmlExport)
                }
            }
        };

        Ok(self.finish(&doc.name, scan, source))
    }

    async fn extract_native(
        &self,
        store: &dyn DocumentStore,
        doc: &DocumentRef,
    ) -> Result<(Scan, LinkSource)> {
        let body = store.get_document_body(&doc.id).await?;
        let native_text = match NativeDocument::from_json(&body) {
            Ok(tree) => {
                let scan = tree.scan();
                if !scan.emails.is_empty() {
                    return Ok((scan, LinkSource::NativeStructure));
                }
                scan.plain_text
            }
            Err(e) => {
                warn!(error = %e, "native body unusable, falling back to exports");
                String::new()
            }
        };

        debug!("no mail-links in native structure, trying HTML export");
        match store.export_as(&doc.id, ExportFormat::Html).await {
            Ok(bytes) => {
                let html_scan = scan_html(&String::from_utf8_lossy(&bytes));
                if !html_scan.emails.is_empty() {
                    let plain_text = if native_text.trim().is_empty() {
                        html_scan.plain_text
                    } else {
                        native_text
                    };
                    return Ok((
                        Scan {
                            plain_text,
                            emails: html_scan.emails,
                        },
                        LinkSource::HtmlExport,
                    ));
                }
            }
            Err(e) => warn!(error = %e, "HTML export failed"),
        }

        if !native_text.trim().is_empty() {
            return Ok(self.plain_fallback(native_text));
        }
        let bytes = store.export_as(&doc.id, ExportFormat::PlainText).await?;
        Ok(self.plain_fallback(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn plain_fallback(&self, text: String) -> (Scan, LinkSource) {
        let scan = scan_plain(&text);
        let source = if scan.emails.is_empty() {
            LinkSource::None
        } else {
            LinkSource::PlainTextScan
        };
        (scan, source)
    }

    /// Extract from a body that is already local (no store round trips).
    pub async fn extract_local(&self, title: &str, body: LocalBody) -> Result<RawExtraction> {
        let (scan, source) = match body {
            LocalBody::Native(json) => {
                let scan = NativeDocument::from_json(&json)?.scan();
                if scan.emails.is_empty() {
                    self.plain_fallback(scan.plain_text)
                } else {
                    (scan, LinkSource::NativeStructure)
                }
            }
            LocalBody::Html(html) => {
                let scan = scan_html(&html);
                if scan.emails.is_empty() {
                    self.plain_fallback(scan.plain_text)
                } else {
                    (scan, LinkSource::HtmlExport)
                }
            }
            LocalBody::PlainText(text) => self.plain_fallback(text),
        };
        Ok(self.finish(title, scan, source))
    }

    /// Convert a Word file on disk, then extract from the HTML.
    pub async fn extract_word_bytes(&self, title: &str, data: &[u8]) -> Result<RawExtraction> {
        let html = docx_to_html(&self.pandoc_cmd, data).await?;
        self.extract_local(title, LocalBody::Html(html)).await
    }

    fn finish(&self, title: &str, scan: Scan, link_source: LinkSource) -> RawExtraction {
        let title_hint = self.titles.first_match(title);
        info!(
            emails = scan.emails.len(),
            invited = scan.emails.iter().filter(|e| e.in_invited_section).count(),
            source = ?link_source,
            title_founder = title_hint.as_ref().map(|h| h.founder_name.as_str()),
            "content extracted"
        );
        RawExtraction {
            title: title.to_string(),
            plain_text: scan.plain_text,
            emails: scan.emails,
            link_source,
            title_hint,
        }
    }
}
