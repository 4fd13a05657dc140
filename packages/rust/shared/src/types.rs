//! Core domain types for the meeting-note ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// MIME type of a native cloud document.
pub const NATIVE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// MIME type of an uploaded Word document.
pub const WORD_DOC_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ---------------------------------------------------------------------------
// DocumentRef
// ---------------------------------------------------------------------------

/// Which body shape a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeKind {
    /// Structured paragraph tree, readable through the documents API.
    NativeDoc,
    /// Word-processor upload; only the raw bytes are available.
    WordExport,
}

impl MimeKind {
    /// Map a store MIME type onto a supported kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            NATIVE_DOC_MIME => Some(Self::NativeDoc),
            WORD_DOC_MIME => Some(Self::WordExport),
            _ => None,
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::NativeDoc => NATIVE_DOC_MIME,
            Self::WordExport => WORD_DOC_MIME,
        }
    }
}

/// Snapshot of external document metadata at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Opaque store id; identity of the document.
    pub id: String,
    /// Document title as shown in the store.
    pub name: String,
    pub mime_kind: MimeKind,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Extraction intermediates
// ---------------------------------------------------------------------------

/// A mail-link (or bare address) discovered while walking a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEmail {
    /// Mailbox only: no `mailto:` prefix, no `?query` suffix.
    pub address: String,
    /// Visible text of the link (or the address itself for bare matches).
    pub display_text: String,
    pub in_invited_section: bool,
    /// Section state at discovery: `start`, `invited` or `post_invited`.
    pub section_label: String,
}

/// Which extraction pass produced the email list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    NativeStructure,
    HtmlExport,
    PlainTextScan,
    /// No pass found any address.
    None,
}

/// Founder (and sometimes company) recovered from the document title alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleHint {
    pub founder_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Name of the title pattern that matched.
    pub pattern: String,
}

/// Plain text plus discovered emails for one processing attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtraction {
    pub title: String,
    pub plain_text: String,
    /// Discovered addresses in document order.
    pub emails: Vec<ExtractedEmail>,
    pub link_source: LinkSource,
    /// Title-based last resort, collected independently of email discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_hint: Option<TitleHint>,
}

// ---------------------------------------------------------------------------
// Founder resolution
// ---------------------------------------------------------------------------

/// Which heuristic produced a [`FounderCandidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    InvitedSection,
    FallbackAnyEmail,
    TitlePatternPlusProximity,
    /// No deterministic answer; the model has to find or infer the founder.
    AiModel,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvitedSection => "invited_section",
            Self::FallbackAnyEmail => "fallback_any_email",
            Self::TitlePatternPlusProximity => "title_pattern_plus_proximity",
            Self::AiModel => "ai_model",
        }
    }
}

/// The resolver's best guess at the meeting's external attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FounderCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub source: CandidateSource,
}

// ---------------------------------------------------------------------------
// EntityRecord
// ---------------------------------------------------------------------------

/// Final structured output handed to the deal namer and the email drafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub founder_name: String,
    #[serde(default)]
    pub founder_email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Discussion points, in the order the model listed them.
    #[serde(default, deserialize_with = "string_or_list")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub next_steps: Vec<String>,
}

/// Accept either `"a"` or `["a", "b"]` (or `null`) for list-valued fields.
pub fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<Option<String>>),
    }

    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    let items = match value {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(items)) => items.into_iter().flatten().collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// Durable record of a processed document, keyed by `document_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub document_id: String,
    pub document_name: String,
    pub founder_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// CRM organization name the deal was filed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Set only when the CRM acknowledged the pipeline entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_deal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_draft_id: Option<String>,
    pub processed_at: DateTime<Utc>,
}
