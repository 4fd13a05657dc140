//! Shared HTTP plumbing for the collaborator clients.

use std::time::Duration;

use dealscout_shared::{DealScoutError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("DealScout/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into a `Network` error carrying a body excerpt.
pub(crate) async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(300).collect();
    Err(DealScoutError::Network(format!("{what}: HTTP {status}: {excerpt}")))
}

pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| DealScoutError::malformed(format!("{what}: failed to parse response: {e}")))
}

/// Render an id field that may arrive as a number or a string.
pub(crate) fn id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Send numeric ids as JSON numbers, anything else as a string.
pub(crate) fn id_to_json(id: &str) -> serde_json::Value {
    id.parse::<i64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(id))
}
