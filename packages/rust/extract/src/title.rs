//! Founder/company hints from the document title.
//!
//! Patterns are tried in rank order; the first one that yields a result wins.

use std::sync::LazyLock;

use dealscout_shared::{DealScoutError, Result, TitleHint};
use regex::Regex;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single title shape.
pub trait TitlePattern: Send + Sync {
    /// Try to read a founder (and maybe a company) out of `title`.
    fn parse(&self, title: &str) -> Option<TitleHint>;

    /// Pattern name recorded on the hint.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds title patterns in priority order.
pub struct TitlePatternRegistry {
    patterns: Vec<Box<dyn TitlePattern>>,
}

impl TitlePatternRegistry {
    /// Built-in patterns, most specific first.
    pub fn new(principal_first_name: &str) -> Result<Self> {
        Ok(Self {
            patterns: vec![
                Box::new(WithPrincipal::new(principal_first_name)?),
                Box::new(MeetingWith),
                Box::new(NameParenCompany),
                Box::new(DashSeparated),
            ],
        })
    }

    pub fn first_match(&self, title: &str) -> Option<TitleHint> {
        self.patterns.iter().find_map(|p| {
            let hint = p.parse(title)?;
            tracing::debug!(pattern = p.name(), founder = %hint.founder_name, "title pattern matched");
            Some(hint)
        })
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// `"<Name> and <Principal> ..."`
struct WithPrincipal {
    re: Regex,
}

impl WithPrincipal {
    fn new(principal_first_name: &str) -> Result<Self> {
        let principal = principal_first_name.trim();
        if principal.is_empty() {
            return Err(DealScoutError::config("internal principal name is empty"));
        }
        let re = Regex::new(&format!(
            r"(?i)^\s*(.+?)\s+(?:and|&)\s+{}\b",
            regex::escape(principal)
        ))
        .map_err(|e| DealScoutError::config(format!("invalid principal pattern: {e}")))?;
        Ok(Self { re })
    }
}

impl TitlePattern for WithPrincipal {
    fn parse(&self, title: &str) -> Option<TitleHint> {
        let caps = self.re.captures(title)?;
        let name = clean(caps.get(1)?.as_str());
        (!name.is_empty() && name.split_whitespace().count() <= 5).then(|| TitleHint {
            founder_name: name,
            company_name: None,
            pattern: self.name().into(),
        })
    }

    fn name(&self) -> &'static str {
        "name_and_principal"
    }
}

/// `"Meeting with <Name> - <Company> - ..."` (or `"Call with"`).
struct MeetingWith;

static MEETING_WITH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:meeting|call)\s+with\s+([^-–]+?)\s*[-–]\s*([^-–]+?)\s*(?:[-–]|$)")
        .expect("valid regex")
});

impl TitlePattern for MeetingWith {
    fn parse(&self, title: &str) -> Option<TitleHint> {
        let caps = MEETING_WITH_RE.captures(title)?;
        let name = clean(caps.get(1)?.as_str());
        let company = clean(caps.get(2)?.as_str());
        (looks_like_person(&name) && !company.is_empty()).then(|| TitleHint {
            founder_name: name,
            company_name: Some(company),
            pattern: self.name().into(),
        })
    }

    fn name(&self) -> &'static str {
        "meeting_with"
    }
}

/// `"<Name> (<Company>) ..."`
struct NameParenCompany;

static NAME_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z .'-]*?)\s*\(([^)]+)\)").expect("valid regex")
});

impl TitlePattern for NameParenCompany {
    fn parse(&self, title: &str) -> Option<TitleHint> {
        let caps = NAME_PAREN_RE.captures(title)?;
        let name = clean(caps.get(1)?.as_str());
        let company = clean(caps.get(2)?.as_str());
        (looks_like_person(&name) && !company.is_empty()).then(|| TitleHint {
            founder_name: name,
            company_name: Some(company),
            pattern: self.name().into(),
        })
    }

    fn name(&self) -> &'static str {
        "name_paren_company"
    }
}

/// `"<A> - <B> - ..."` where one side reads as a person and the other as a company.
struct DashSeparated;

static DASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^-–]+?)\s*[-–]\s*([^-–]+?)\s*[-–]").expect("valid regex")
});

impl TitlePattern for DashSeparated {
    fn parse(&self, title: &str) -> Option<TitleHint> {
        let caps = DASH_RE.captures(title)?;
        let first = clean(caps.get(1)?.as_str());
        let second = clean(caps.get(2)?.as_str());

        let (name, company) = if looks_like_person(&first) && looks_like_company(&second) {
            (first, second)
        } else if looks_like_person(&second) && looks_like_company(&first) {
            (second, first)
        } else {
            return None;
        };

        Some(TitleHint {
            founder_name: name,
            company_name: Some(company),
            pattern: self.name().into(),
        })
    }

    fn name(&self) -> &'static str {
        "dash_separated"
    }
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

const COMPANY_INDICATORS: &[&str] = &[
    "corp", "inc", "llc", "ltd", "company", "co", "technologies", "tech", "labs", "ai",
    "software", "systems", "solutions",
];

fn clean(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_company_indicator(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| COMPANY_INDICATORS.contains(&w.to_lowercase().as_str()))
}

fn all_capitalized(text: &str) -> bool {
    text.split_whitespace()
        .all(|w| w.chars().next().is_some_and(char::is_uppercase))
}

/// One to four capitalized words, alphabetic, with no company indicator.
pub fn looks_like_person(text: &str) -> bool {
    let words = text.split_whitespace().count();
    (1..=4).contains(&words)
        && all_capitalized(text)
        && text
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '.' | '\'' | '-'))
        && !has_company_indicator(text)
}

/// A company indicator, or a capitalized phrase that is not a person name.
pub fn looks_like_company(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    has_company_indicator(text) || (all_capitalized(text) && !looks_like_person(text))
}
