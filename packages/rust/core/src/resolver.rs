//! Founder resolution: a ranked fallback chain over the extraction output.
//!
//! 1. first non-excluded address tagged inside the Invited section
//! 2. first non-excluded address anywhere
//! 3. title-derived name plus an address near that name in the text
//! 4. nothing deterministic; the model has to decide

use std::sync::LazyLock;

use dealscout_extract::{find_bare_emails, local_part};
use dealscout_shared::{CandidateSource, ExtractedEmail, FounderCandidate, RawExtraction};
use regex::Regex;
use tracing::debug;

/// Characters scanned before the name occurrence.
const WINDOW_BEFORE: usize = 100;
/// Characters scanned from the name occurrence onwards.
const WINDOW_AFTER: usize = 200;

/// True when the address's local part contains any exclusion token.
pub fn is_excluded(address: &str, exclude_names: &[String]) -> bool {
    let local = local_part(address).to_lowercase();
    exclude_names
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .any(|t| local.contains(&t))
}

pub fn resolve(raw: &RawExtraction, exclude_names: &[String]) -> FounderCandidate {
    let title_name = raw.title_hint.as_ref().map(|h| h.founder_name.clone());

    let candidate = invited_email(raw, exclude_names, title_name.as_deref())
        .or_else(|| any_email(raw, exclude_names, title_name.as_deref()))
        .or_else(|| {
            title_name
                .as_deref()
                .and_then(|name| proximity_email(raw, name, exclude_names))
        })
        .unwrap_or_else(|| FounderCandidate {
            name: title_name.clone(),
            email: None,
            source: CandidateSource::AiModel,
        });

    debug!(
        source = candidate.source.as_str(),
        email = candidate.email.as_deref(),
        name = candidate.name.as_deref(),
        "founder resolved"
    );
    candidate
}

fn from_email(email: &ExtractedEmail, title_name: Option<&str>, source: CandidateSource) -> FounderCandidate {
    let display = email.display_text.trim();
    let name = if display.is_empty() || display.contains('@') {
        title_name.map(String::from)
    } else {
        Some(display.to_string())
    };
    FounderCandidate {
        name,
        email: Some(email.address.clone()),
        source,
    }
}

fn invited_email(
    raw: &RawExtraction,
    exclude_names: &[String],
    title_name: Option<&str>,
) -> Option<FounderCandidate> {
    raw.emails
        .iter()
        .filter(|e| e.in_invited_section)
        .find(|e| !is_excluded(&e.address, exclude_names))
        .map(|e| from_email(e, title_name, CandidateSource::InvitedSection))
}

fn any_email(
    raw: &RawExtraction,
    exclude_names: &[String],
    title_name: Option<&str>,
) -> Option<FounderCandidate> {
    raw.emails
        .iter()
        .find(|e| !is_excluded(&e.address, exclude_names))
        .map(|e| from_email(e, title_name, CandidateSource::FallbackAnyEmail))
}

fn proximity_email(
    raw: &RawExtraction,
    name: &str,
    exclude_names: &[String],
) -> Option<FounderCandidate> {
    let pos = find_case_insensitive(&raw.plain_text, name)?;
    let window = char_window(&raw.plain_text, pos, WINDOW_BEFORE, WINDOW_AFTER);
    let email = find_bare_emails(window).find(|a| !is_excluded(a, exclude_names))?;
    Some(FounderCandidate {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        source: CandidateSource::TitlePatternPlusProximity,
    })
}

/// Byte offset of the first case-insensitive occurrence of `needle`.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    // Any whitespace run in the name matches any whitespace run in the text.
    let pattern = WS_RE.replace_all(&regex::escape(needle), r"\s+").into_owned();
    let re = Regex::new(&format!("(?i){pattern}")).ok()?;
    re.find(haystack).map(|m| m.start())
}

/// Slice of `text` spanning `before` chars ahead of `pos` to `after` chars past it.
fn char_window(text: &str, pos: usize, before: usize, after: usize) -> &str {
    let start = match before {
        0 => pos,
        n => text[..pos].char_indices().rev().nth(n - 1).map_or(0, |(i, _)| i),
    };
    let end = text[pos..]
        .char_indices()
        .nth(after)
        .map_or(text.len(), |(i, _)| pos + i);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscout_shared::{LinkSource, TitleHint};

    fn email(address: &str, display: &str, invited: bool) -> ExtractedEmail {
        ExtractedEmail {
            address: address.into(),
            display_text: display.into(),
            in_invited_section: invited,
            section_label: if invited { "invited" } else { "start" }.into(),
        }
    }

    fn raw(emails: Vec<ExtractedEmail>, text: &str, title_name: Option<&str>) -> RawExtraction {
        RawExtraction {
            title: "Notes".into(),
            plain_text: text.into(),
            emails,
            link_source: LinkSource::NativeStructure,
            title_hint: title_name.map(|n| TitleHint {
                founder_name: n.into(),
                company_name: None,
                pattern: "name_and_principal".into(),
            }),
        }
    }

    fn exclude() -> Vec<String> {
        vec!["adarsh".into()]
    }

    #[test]
    fn invited_section_skips_excluded_principal() {
        let r = raw(
            vec![
                email("adarsh@firm.com", "Adarsh Bhatt", true),
                email("founder@startup.io", "Jane Doe", true),
            ],
            "",
            None,
        );
        let c = resolve(&r, &exclude());
        assert_eq!(c.email.as_deref(), Some("founder@startup.io"));
        assert_eq!(c.name.as_deref(), Some("Jane Doe"));
        assert_eq!(c.source, CandidateSource::InvitedSection);
    }

    #[test]
    fn invited_beats_earlier_uninvited() {
        let r = raw(
            vec![
                email("intro@vc.com", "Intro", false),
                email("jane@acme.io", "jane@acme.io", true),
            ],
            "",
            Some("Jane"),
        );
        let c = resolve(&r, &exclude());
        assert_eq!(c.email.as_deref(), Some("jane@acme.io"));
        assert_eq!(c.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn falls_back_to_any_email() {
        let r = raw(
            vec![
                email("ADARSH.B@firm.com", "Adarsh", true),
                email("raj@corp.com", "Raj", false),
            ],
            "",
            None,
        );
        let c = resolve(&r, &exclude());
        assert_eq!(c.email.as_deref(), Some("raj@corp.com"));
        assert_eq!(c.source, CandidateSource::FallbackAnyEmail);
    }

    #[test]
    fn exclusion_checks_local_part_only() {
        assert!(is_excluded("Adarsh@x.com", &exclude()));
        assert!(!is_excluded("jane@adarsh-capital.com", &exclude()));
        assert!(!is_excluded("jane@x.com", &["  ".to_string()]));
    }

    #[test]
    fn title_name_with_nearby_address() {
        let padding = "x".repeat(150);
        let text = format!(
            "{padding} far@away.com {padding}\nAttendees: jane DOE (jane@acme.io), adarsh@firm.com"
        );
        let r = raw(Vec::new(), &text, Some("Jane Doe"));
        let c = resolve(&r, &exclude());
        assert_eq!(c.email.as_deref(), Some("jane@acme.io"));
        assert_eq!(c.name.as_deref(), Some("Jane Doe"));
        assert_eq!(c.source, CandidateSource::TitlePatternPlusProximity);
    }

    #[test]
    fn principal_address_first_in_window_is_skipped() {
        let text = "Call notes: adarsh@firm.com joined with Jane Doe <jane@acme.io>";
        let r = raw(Vec::new(), text, Some("Jane Doe"));
        let c = resolve(&r, &exclude());
        assert_eq!(c.email.as_deref(), Some("jane@acme.io"));
        assert_eq!(c.source, CandidateSource::TitlePatternPlusProximity);

        let only_principal = raw(Vec::new(), "Jane Doe met adarsh@firm.com", Some("Jane Doe"));
        let c = resolve(&only_principal, &exclude());
        assert_eq!(c.email, None);
        assert_eq!(c.source, CandidateSource::AiModel);
    }

    #[test]
    fn address_outside_window_is_ignored() {
        let text = format!("Jane Doe{}jane@acme.io", " ".repeat(250));
        let r = raw(Vec::new(), &text, Some("Jane Doe"));
        let c = resolve(&r, &exclude());
        assert_eq!(c.email, None);
        assert_eq!(c.name.as_deref(), Some("Jane Doe"));
        assert_eq!(c.source, CandidateSource::AiModel);
    }

    #[test]
    fn nothing_found_defers_to_model() {
        let r = raw(vec![email("adarsh@firm.com", "Adarsh", true)], "", None);
        let c = resolve(&r, &exclude());
        assert_eq!(
            c,
            FounderCandidate {
                name: None,
                email: None,
                source: CandidateSource::AiModel
            }
        );
    }

    #[test]
    fn window_respects_char_boundaries() {
        let text = "ééééé Jane é jane@acme.io";
        let pos = text.find("Jane").unwrap();
        let w = char_window(text, pos, 3, 100);
        assert!(w.starts_with("é"));
        assert!(w.ends_with("jane@acme.io"));
    }
}
