//! Mail-link extraction from an HTML export.

use dealscout_shared::ExtractedEmail;
use scraper::{ElementRef, Html, Node};

use crate::email::parse_mailto;
use crate::section::{MarkerMatch, SectionTracker};
use crate::Scan;

/// Elements whose text never belongs to the document body.
const SKIP_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Elements that start a new line in the flattened text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "table", "ul", "ol",
    "blockquote", "section",
];

/// Walk the HTML in document order, flattening text and collecting
/// `mailto:` anchors tagged with the section they appear in.
///
/// Text is gathered per block so a marker split across styled spans is
/// still seen whole; each block's text is observed before its anchors are
/// tagged.
pub fn scan_html(html: &str) -> Scan {
    let document = Html::parse_document(html);
    let mut block = Block::new();
    let mut scan = Scan::default();

    for node in document.tree.root().descendants() {
        if node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|e| SKIP_TAGS.contains(&e.name()))
        {
            continue;
        }

        match node.value() {
            Node::Text(text) => block.text.push_str(text),
            Node::Element(element) => {
                if SKIP_TAGS.contains(&element.name()) {
                    continue;
                }
                if BLOCK_TAGS.contains(&element.name()) {
                    block.flush(&mut scan);
                }
                if element.name() != "a" {
                    continue;
                }
                let Some(address) = element.attr("href").and_then(parse_mailto) else {
                    continue;
                };
                let display_text = ElementRef::wrap(node)
                    .map(|a| a.text().collect::<String>())
                    .unwrap_or_default();
                block.anchors.push((address, display_text.trim().to_string()));
            }
            _ => {}
        }
    }
    block.flush(&mut scan);

    scan
}

/// Text and mail-links of the block being walked.
struct Block {
    tracker: SectionTracker,
    text: String,
    anchors: Vec<(String, String)>,
}

impl Block {
    fn new() -> Self {
        Self {
            tracker: SectionTracker::new(MarkerMatch::WordBoundary),
            text: String::new(),
            anchors: Vec::new(),
        }
    }

    fn flush(&mut self, scan: &mut Scan) {
        if !self.text.is_empty() {
            self.tracker.observe(&self.text);
            if !scan.plain_text.is_empty() && !scan.plain_text.ends_with('\n') {
                scan.plain_text.push('\n');
            }
            scan.plain_text.push_str(&self.text);
            self.text.clear();
        }

        for (address, display_text) in self.anchors.drain(..) {
            scan.emails.push(ExtractedEmail {
                address,
                display_text,
                in_invited_section: self.tracker.in_invited(),
                section_label: self.tracker.state().label().to_string(),
            });
        }
    }
}
