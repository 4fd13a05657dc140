//! Invited-section state machine shared by every extraction pass.

use std::sync::LazyLock;

use regex::Regex;

/// Where the walk currently is relative to the attendee list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Start,
    Invited,
    PostInvited,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Invited => "invited",
            Self::PostInvited => "post_invited",
        }
    }
}

/// How the "Invited" marker is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerMatch {
    /// Plain substring, as in native paragraphs.
    Substring,
    /// Whole word only; used on flattened HTML text where substrings of
    /// longer words are common.
    WordBoundary,
}

static INVITED_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bInvited\b").expect("valid regex"));

/// Tracks `start → invited → post_invited` over a sequence of text blocks.
///
/// Callers feed each block's text to [`observe`](Self::observe) *before*
/// tagging the addresses found in that block.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    state: Section,
    mode: MarkerMatch,
}

impl SectionTracker {
    pub fn new(mode: MarkerMatch) -> Self {
        Self {
            state: Section::Start,
            mode,
        }
    }

    pub fn observe(&mut self, text: &str) {
        let next = if self.has_invited_marker(text) {
            Section::Invited
        } else if self.state == Section::Invited
            && (text.contains("Attachments") || text.contains("Meeting"))
        {
            Section::PostInvited
        } else {
            self.state
        };

        if next != self.state {
            tracing::trace!(from = self.state.label(), to = next.label(), "section transition");
            self.state = next;
        }
    }

    pub fn state(&self) -> Section {
        self.state
    }

    pub fn in_invited(&self) -> bool {
        self.state == Section::Invited
    }

    fn has_invited_marker(&self, text: &str) -> bool {
        match self.mode {
            MarkerMatch::Substring => text.contains("Invited"),
            MarkerMatch::WordBoundary => INVITED_WORD_RE.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(mode: MarkerMatch, blocks: &[&str]) -> Vec<Section> {
        let mut tracker = SectionTracker::new(mode);
        blocks
            .iter()
            .map(|b| {
                tracker.observe(b);
                tracker.state()
            })
            .collect()
    }

    #[test]
    fn enters_and_leaves_invited() {
        let states = walk(
            MarkerMatch::Substring,
            &["Agenda", "Invited: a@x.com", "Jane Doe", "Attachments: none", "c@z.com"],
        );
        assert_eq!(
            states,
            vec![
                Section::Start,
                Section::Invited,
                Section::Invited,
                Section::PostInvited,
                Section::PostInvited
            ]
        );
    }

    #[test]
    fn meeting_only_closes_an_open_section() {
        let states = walk(MarkerMatch::Substring, &["Meeting notes", "Invited", "Meeting recording"]);
        assert_eq!(states, vec![Section::Start, Section::Invited, Section::PostInvited]);
    }

    #[test]
    fn invited_marker_reopens_section() {
        let states = walk(MarkerMatch::Substring, &["Invited", "Attachments", "Invited again"]);
        assert_eq!(states[2], Section::Invited);
    }

    #[test]
    fn word_boundary_ignores_embedded_marker() {
        let states = walk(MarkerMatch::WordBoundary, &["UnInvitedGuests", "Invited:"]);
        assert_eq!(states, vec![Section::Start, Section::Invited]);
        let states = walk(MarkerMatch::Substring, &["UnInvitedGuests"]);
        assert_eq!(states, vec![Section::Invited]);
    }
}
