//! AI entity extraction: one prompt, one JSON object out of a free-form reply.

use dealscout_services::TextGenerator;
use dealscout_shared::{
    DealScoutError, EntityRecord, FounderCandidate, Result, TitleHint, types::string_or_list,
};
use serde::Deserialize;
use tracing::{instrument, warn};

/// What the model is asked to return. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelEntities {
    #[serde(default)]
    pub founder_name: Option<String>,
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
    #[serde(default, deserialize_with = "string_or_list")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub next_steps: Vec<String>,
}

/// Limits and policy the prompt is built with.
#[derive(Debug, Clone)]
pub struct EntityPromptSettings {
    pub internal_principal: String,
    pub exclude_names: Vec<String>,
    pub max_tokens: u32,
    pub content_char_budget: usize,
}

pub struct EntityExtractor<'a> {
    generator: &'a dyn TextGenerator,
    settings: &'a EntityPromptSettings,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(generator: &'a dyn TextGenerator, settings: &'a EntityPromptSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Prompt, parse, reconcile. Fails on transport errors, unparsable
    /// output, or a missing founder name.
    #[instrument(skip_all, fields(title = %title, hint_source = hint.source.as_str()))]
    pub async fn extract_entities(
        &self,
        text: &str,
        title: &str,
        hint: &FounderCandidate,
        title_hint: Option<&TitleHint>,
    ) -> Result<EntityRecord> {
        let prompt = build_prompt(text, title, hint, self.settings);
        let reply = self
            .generator
            .generate(&prompt, self.settings.max_tokens)
            .await?;

        let parsed = parse_reply(&reply).inspect_err(|e| {
            warn!(error = %e, raw_response = %truncate_chars(&reply, 500), "model reply could not be decoded");
        })?;
        reconcile(parsed, hint, title_hint)
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(
    text: &str,
    title: &str,
    hint: &FounderCandidate,
    settings: &EntityPromptSettings,
) -> String {
    let email_instruction = match hint.email.as_deref() {
        Some(email) => format!(
            "The founder's email address has been identified from the meeting invite: {email}. \
             Use exactly this value for founder_email."
        ),
        None => "No founder email was found in the attendee list. Search the document for one; \
                 if none is present, return null for founder_email."
            .to_string(),
    };
    let name_instruction = hint
        .name
        .as_deref()
        .map(|n| format!("\nThe founder is probably {n}."))
        .unwrap_or_default();

    let body = truncate_chars(text, settings.content_char_budget);
    let truncated = if body.len() < text.len() {
        "\n[content truncated]"
    } else {
        ""
    };

    format!(
        r#"Extract founder and company information from this meeting document.

{email_instruction}{name_instruction}

{principal} is the investor who ran the meeting. Never report {principal} (or any address containing {excluded}) as the founder.
Only use information stated in the document. Use null for anything that is not stated.

Document Title: {title}
Content:
{body}{truncated}

Return only a JSON object:
{{
  "founder_name": "...",
  "founder_email": "...",
  "company_name": "...",
  "industry": "...",
  "stage": "...",
  "summary": "...",
  "key_points": ["..."],
  "next_steps": ["..."]
}}"#,
        principal = settings.internal_principal,
        excluded = settings.exclude_names.join(", "),
    )
}

/// Decode the substring from the first `{` to the last `}`.
pub fn parse_reply(reply: &str) -> Result<ModelEntities> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(DealScoutError::malformed("no JSON object in model reply"));
    };
    if end < start {
        return Err(DealScoutError::malformed("no JSON object in model reply"));
    }
    serde_json::from_str(&reply[start..=end])
        .map_err(|e| DealScoutError::malformed(format!("model reply is not valid JSON: {e}")))
}

/// Placeholder answers that mean "not stated".
fn meaningful(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| {
            !v.is_empty()
                && !["null", "none", "n/a", "na", "unknown", "..."]
                    .contains(&v.to_ascii_lowercase().as_str())
        })
}

/// Merge the model output with the deterministic signals.
///
/// The hint's email fills `founder_email` only when the model gave none.
/// A model-provided email is kept even if it disagrees with the hint.
pub fn reconcile(
    model: ModelEntities,
    hint: &FounderCandidate,
    title_hint: Option<&TitleHint>,
) -> Result<EntityRecord> {
    let founder_name = meaningful(model.founder_name)
        .or_else(|| meaningful(hint.name.clone()))
        .ok_or_else(|| DealScoutError::policy("no founder name after all fallbacks"))?;

    let founder_email = meaningful(model.founder_email).or_else(|| hint.email.clone());
    let company_name = meaningful(model.company_name)
        .or_else(|| title_hint.and_then(|t| meaningful(t.company_name.clone())));

    Ok(EntityRecord {
        founder_name,
        founder_email,
        company_name,
        industry: meaningful(model.industry),
        stage: meaningful(model.stage),
        summary: meaningful(model.summary),
        key_points: model.key_points,
        next_steps: model.next_steps,
    })
}
