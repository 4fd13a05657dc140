//! Last-resort scan for bare addresses in plain text.

use dealscout_shared::ExtractedEmail;

use crate::email::find_bare_emails;
use crate::section::{MarkerMatch, SectionTracker};
use crate::Scan;

/// Scan `text` line by line, tagging each bare address with the section
/// state after its line has been observed.
pub fn scan_plain(text: &str) -> Scan {
    let mut tracker = SectionTracker::new(MarkerMatch::Substring);
    let mut emails = Vec::new();

    for line in text.lines() {
        tracker.observe(line);
        for address in find_bare_emails(line) {
            emails.push(ExtractedEmail {
                address: address.to_string(),
                display_text: address.to_string(),
                in_invited_section: tracker.in_invited(),
                section_label: tracker.state().label().to_string(),
            });
        }
    }

    Scan {
        plain_text: text.to_string(),
        emails,
    }
}
