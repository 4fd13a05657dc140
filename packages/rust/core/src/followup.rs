//! Follow-up email drafting and the CRM meeting note.

use dealscout_services::{MailDrafter, TextGenerator};
use dealscout_shared::{EntityRecord, Result};
use tracing::{debug, instrument};

use crate::entities::truncate_chars;

pub fn followup_subject(record: &EntityRecord) -> String {
    format!("Great meeting you - {}", record.founder_name)
}

pub fn followup_prompt(record: &EntityRecord, title: &str, from_name: &str) -> String {
    let next_steps = if record.next_steps.is_empty() {
        "(none recorded)".to_string()
    } else {
        record
            .next_steps
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Write a professional follow-up email after a VC meeting.\n\n\
         CONTEXT:\n\
         - Founder: {founder}\n\
         - Email: {email}\n\
         - Company: {company}\n\
         - Meeting: {title}\n\n\
         NEXT STEPS TO INCLUDE:\n{next_steps}\n\n\
         Write a warm, professional email from {from_name} confirming the next steps and \
         offering continued support. Return only the email body, without a subject line or signature.",
        founder = record.founder_name,
        email = record.founder_email.as_deref().unwrap_or("unknown"),
        company = record.company_name.as_deref().unwrap_or("the company"),
    )
}

pub fn with_signoff(body: &str, from_name: &str) -> String {
    format!("{}\n\nBest regards,\n{from_name}", body.trim_end())
}

/// Note body attached to the CRM organization.
pub fn note_content(title: &str, record: &EntityRecord, plain_text: &str, max_chars: usize) -> String {
    let mut sections = Vec::new();
    if let Some(summary) = &record.summary {
        sections.push(format!("Summary: {summary}"));
    }
    if !record.key_points.is_empty() {
        sections.push(bullets("Discussion points", &record.key_points));
    }
    if !record.next_steps.is_empty() {
        sections.push(bullets("Next steps", &record.next_steps));
    }

    let mut note = format!("Meeting Notes - {title}");
    if !sections.is_empty() {
        note.push_str("\n\n");
        note.push_str(&sections.join("\n\n"));
    }
    let text = truncate_chars(plain_text.trim(), max_chars);
    if !text.is_empty() {
        note.push_str("\n\n");
        note.push_str(text);
    }
    note
}

fn bullets(heading: &str, items: &[String]) -> String {
    let lines: Vec<String> = items.iter().map(|i| format!("- {i}")).collect();
    format!("{heading}:\n{}", lines.join("\n"))
}

pub struct FollowupDrafter<'a> {
    pub generator: &'a dyn TextGenerator,
    pub mail: &'a dyn MailDrafter,
    pub max_tokens: u32,
    pub from_name: &'a str,
}

impl FollowupDrafter<'_> {
    /// Draft a follow-up to the founder. `Ok(None)` when no address is known.
    #[instrument(skip_all, fields(founder = %record.founder_name))]
    pub async fn draft(&self, record: &EntityRecord, title: &str) -> Result<Option<String>> {
        let Some(to) = record.founder_email.as_deref() else {
            debug!("no founder email, skipping follow-up draft");
            return Ok(None);
        };

        let prompt = followup_prompt(record, title, self.from_name);
        let body = self.generator.generate(&prompt, self.max_tokens).await?;
        let body = with_signoff(&body, self.from_name);

        let draft_id = self
            .mail
            .create_draft(to, &followup_subject(record), &body)
            .await?;
        Ok(Some(draft_id))
    }
}
