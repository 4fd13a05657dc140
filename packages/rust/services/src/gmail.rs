//! Gmail draft creation.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use dealscout_shared::{DealScoutError, GoogleConfig, MailConfig, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

use crate::MailDrafter;
use crate::http::{build_client, check_status, id_to_string, parse_json};

pub struct GmailClient {
    client: Client,
    base_url: String,
    token: String,
    from_email: String,
    from_name: String,
}

impl GmailClient {
    pub fn new(google: &GoogleConfig, mail: &MailConfig, token: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(google.timeout_secs)?,
            base_url: google.gmail_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            from_email: mail.from_email.clone(),
            from_name: mail.from_name.clone(),
        })
    }
}

/// RFC 2047 encoding for header values that are not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

/// Plain-text RFC 5322 message.
pub fn build_message(from_name: &str, from_email: &str, to: &str, subject: &str, body: &str) -> String {
    let from = if from_name.is_empty() {
        from_email.to_string()
    } else {
        format!("{} <{from_email}>", encode_header(from_name))
    };
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}",
        encode_header(subject),
        body.replace("\r\n", "\n").replace('\n', "\r\n"),
    )
}

#[async_trait]
impl MailDrafter for GmailClient {
    #[instrument(skip(self, body))]
    async fn create_draft(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let message = build_message(&self.from_name, &self.from_email, to, subject, body);
        let raw = URL_SAFE.encode(message.as_bytes());

        let url = format!("{}/users/me/drafts", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "message": { "raw": raw } }))
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("create draft: {e}")))?;
        let response = check_status(response, "create draft").await?;
        let draft: Value = parse_json(response, "create draft").await?;

        draft
            .get("id")
            .and_then(id_to_string)
            .ok_or_else(|| DealScoutError::malformed("create draft: response has no id"))
    }
}
