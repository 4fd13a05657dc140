//! Typed view of a native document body.
//!
//! The raw JSON is converted once into [`NativeDocument`]; everything after
//! that works on typed data. Paragraphs with an unexpected shape are skipped
//! with a warning.

use dealscout_shared::{DealScoutError, ExtractedEmail, Result};
use serde_json::Value;
use tracing::warn;

use crate::email::parse_mailto;
use crate::section::{MarkerMatch, SectionTracker};
use crate::Scan;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeDocument {
    pub title: Option<String>,
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralElement {
    Paragraph(Paragraph),
    /// Rows of cells, each cell holding its own element sequence.
    Table(Vec<Vec<Vec<StructuralElement>>>),
    SectionBreak,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    /// Hyperlink target, if the run carries one.
    pub link: Option<String>,
}

impl NativeDocument {
    /// Build the typed tree. Fails only when `body.content` itself is missing.
    pub fn from_json(doc: &Value) -> Result<Self> {
        let content = doc
            .pointer("/body/content")
            .and_then(Value::as_array)
            .ok_or_else(|| DealScoutError::malformed("document has no body.content array"))?;

        Ok(Self {
            title: doc.get("title").and_then(Value::as_str).map(String::from),
            content: parse_elements(content),
        })
    }

    /// Walk paragraphs in document order, collecting text and mail-links.
    pub fn scan(&self) -> Scan {
        let mut scan = Scan::default();
        let mut tracker = SectionTracker::new(MarkerMatch::Substring);
        scan_elements(&self.content, &mut tracker, &mut scan);
        scan
    }
}

fn parse_elements(items: &[Value]) -> Vec<StructuralElement> {
    items.iter().filter_map(parse_element).collect()
}

fn parse_element(item: &Value) -> Option<StructuralElement> {
    if let Some(paragraph) = item.get("paragraph") {
        return match parse_paragraph(paragraph) {
            Some(p) => Some(StructuralElement::Paragraph(p)),
            None => {
                let start_index = item.get("startIndex").and_then(Value::as_i64);
                warn!(?start_index, "skipping paragraph without elements");
                None
            }
        };
    }

    if let Some(table) = item.get("table") {
        let rows = table
            .get("tableRows")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.get("tableCells")
                            .and_then(Value::as_array)
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|cell| {
                                        cell.get("content")
                                            .and_then(Value::as_array)
                                            .map(|c| parse_elements(c))
                                            .unwrap_or_default()
                                    })
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        return Some(StructuralElement::Table(rows));
    }

    if item.get("sectionBreak").is_some() {
        return Some(StructuralElement::SectionBreak);
    }

    Some(StructuralElement::Other)
}

fn parse_paragraph(paragraph: &Value) -> Option<Paragraph> {
    let elements = paragraph.get("elements")?.as_array()?;
    let runs = elements
        .iter()
        .filter_map(|el| el.get("textRun"))
        .map(|run| TextRun {
            text: run
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            link: run
                .pointer("/textStyle/link/url")
                .and_then(Value::as_str)
                .map(String::from),
        })
        .collect();
    Some(Paragraph { runs })
}

fn scan_elements(elements: &[StructuralElement], tracker: &mut SectionTracker, scan: &mut Scan) {
    for element in elements {
        match element {
            StructuralElement::Paragraph(paragraph) => {
                let text = paragraph.text();
                tracker.observe(&text);

                for run in &paragraph.runs {
                    let Some(address) = run.link.as_deref().and_then(parse_mailto) else {
                        continue;
                    };
                    scan.emails.push(ExtractedEmail {
                        address,
                        display_text: run.text.trim().to_string(),
                        in_invited_section: tracker.in_invited(),
                        section_label: tracker.state().label().to_string(),
                    });
                }
                scan.plain_text.push_str(&text);
            }
            StructuralElement::Table(rows) => {
                for cell in rows.iter().flatten() {
                    scan_elements(cell, tracker, scan);
                }
            }
            StructuralElement::SectionBreak | StructuralElement::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn para(runs: Value) -> Value {
        json!({ "paragraph": { "elements": runs } })
    }

    fn text(s: &str) -> Value {
        json!({ "textRun": { "content": s } })
    }

    fn link(s: &str, url: &str) -> Value {
        json!({ "textRun": { "content": s, "textStyle": { "link": { "url": url } } } })
    }

    fn doc(content: Vec<Value>) -> Value {
        json!({ "title": "Jane and Adarsh", "body": { "content": content } })
    }

    #[test]
    fn tags_invited_section_emails() {
        let body = doc(vec![
            json!({ "sectionBreak": {} }),
            para(json!([text("Agenda\n")])),
            para(json!([
                text("Invited: "),
                link("Adarsh Bhatt", "mailto:adarsh@fund.vc"),
                text(", "),
                link("Jane Doe", "mailto:jane@acme.io?subject=intro"),
                text("\n")
            ])),
            para(json!([text("Attachments: none\n")])),
            para(json!([link("Carl", "mailto:carl@other.com"), text("\n")])),
        ]);

        let scan = NativeDocument::from_json(&body).unwrap().scan();
        let tagged: Vec<_> = scan
            .emails
            .iter()
            .map(|e| (e.address.as_str(), e.in_invited_section, e.section_label.as_str()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                ("adarsh@fund.vc", true, "invited"),
                ("jane@acme.io", true, "invited"),
                ("carl@other.com", false, "post_invited"),
            ]
        );
        assert_eq!(scan.emails[1].display_text, "Jane Doe");
        assert!(scan.plain_text.starts_with("Agenda\nInvited: Adarsh Bhatt, Jane Doe\n"));
    }

    #[test]
    fn malformed_paragraphs_are_skipped() {
        let body = doc(vec![
            json!({ "paragraph": { "style": "no elements here" } }),
            para(json!([text("Invited\n")])),
            para(json!([{ "inlineObjectElement": {} }, link("Jane", "mailto:jane@acme.io")])),
        ]);
        let native = NativeDocument::from_json(&body).unwrap();
        assert_eq!(native.content.len(), 2);
        let scan = native.scan();
        assert_eq!(scan.emails.len(), 1);
        assert!(scan.emails[0].in_invited_section);
    }

    #[test]
    fn walks_table_cells() {
        let body = doc(vec![
            para(json!([text("Invited\n")])),
            json!({ "table": { "tableRows": [
                { "tableCells": [
                    { "content": [para(json!([link("Jane", "mailto:jane@acme.io")]))] },
                    { "content": [para(json!([text("Meeting notes\n")]))] }
                ]}
            ]}}),
            para(json!([link("Bob", "mailto:bob@acme.io")])),
        ]);
        let scan = NativeDocument::from_json(&body).unwrap().scan();
        assert!(scan.emails[0].in_invited_section);
        assert!(!scan.emails[1].in_invited_section);
    }

    #[test]
    fn non_mail_links_are_ignored() {
        let body = doc(vec![para(json!([link("site", "https://acme.io")]))]);
        let scan = NativeDocument::from_json(&body).unwrap().scan();
        assert!(scan.emails.is_empty());
        assert_eq!(scan.plain_text, "site");
    }

    #[test]
    fn missing_body_is_malformed() {
        let err = NativeDocument::from_json(&json!({ "title": "x" })).unwrap_err();
        assert!(matches!(err, DealScoutError::Malformed { .. }));
    }
}
