//! Anthropic Messages API text generator.

use async_trait::async_trait;
use dealscout_shared::{AnthropicConfig, DealScoutError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::TextGenerator;
use crate::http::{build_client, check_status, parse_json};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("generate: {e}")))?;
        let response = check_status(response, "generate").await?;
        let body: MessagesResponse = parse_json(response, "generate").await?;

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(DealScoutError::malformed("generate: response has no text"));
        }
        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnthropicClient {
        let config = AnthropicConfig {
            base_url: server.uri(),
            ..AnthropicConfig::default()
        };
        AnthropicClient::new(&config, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn generates_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 1000,
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    { "type": "text", "text": "{\"founder_name\": " },
                    { "type": "text", "text": "\"Jane\"}" }
                ]
            })))
            .mount(&server)
            .await;

        let text = client_for(&server).generate("hello", 1000).await.unwrap();
        assert_eq!(text, r#"{"founder_name": "Jane"}"#);
    }

    #[tokio::test]
    async fn overloaded_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("hello", 10).await.unwrap_err();
        assert!(matches!(err, DealScoutError::Network(_)));
    }

    #[tokio::test]
    async fn empty_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("hello", 10).await.unwrap_err();
        assert!(matches!(err, DealScoutError::Malformed { .. }));
    }
}
