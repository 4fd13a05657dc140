//! Affinity CRM client.

use async_trait::async_trait;
use dealscout_shared::{AffinityConfig, DealScoutError, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::Crm;
use crate::http::{build_client, check_status, id_to_json, id_to_string, parse_json};

/// Affinity v1 REST API. Authenticates with HTTP Basic, empty user name.
pub struct AffinityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AffinityClient {
    pub fn new(config: &AffinityConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn post(&self, path: &str, body: Value, what: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth("", Some(&self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{what}: {e}")))?;
        let response = check_status(response, what).await?;
        parse_json(response, what).await
    }
}

fn response_id(value: &Value, what: &str) -> Result<String> {
    value
        .get("id")
        .and_then(id_to_string)
        .ok_or_else(|| DealScoutError::malformed(format!("{what}: response has no id")))
}

#[async_trait]
impl Crm for AffinityClient {
    #[instrument(skip(self))]
    async fn create_organization(&self, name: &str) -> Result<String> {
        let org = self
            .post("/organizations", json!({ "name": name }), "create organization")
            .await?;
        let id = response_id(&org, "create organization")?;
        debug!(%id, "organization created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn add_to_pipeline(&self, org_id: &str, list_id: u64) -> Result<String> {
        let entry = self
            .post(
                &format!("/lists/{list_id}/list-entries"),
                json!({ "entity_id": id_to_json(org_id), "list_id": list_id }),
                "add list entry",
            )
            .await?;
        response_id(&entry, "add list entry")
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn attach_note(&self, org_id: &str, text: &str) -> Result<()> {
        self.post(
            "/notes",
            json!({ "content": text, "organization_ids": [id_to_json(org_id)] }),
            "create note",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AffinityClient {
        let config = AffinityConfig {
            base_url: server.uri(),
            ..AffinityConfig::default()
        };
        AffinityClient::new(&config, "secret").unwrap()
    }

    #[tokio::test]
    async fn creates_organization_and_list_entry() {
        let server = MockServer::start().await;

        // base64(":secret")
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .and(header("authorization", "Basic OnNlY3JldA=="))
            .and(body_json(json!({ "name": "Acme" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 4242, "name": "Acme" })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/lists/77/list-entries"))
            .and(body_json(json!({ "entity_id": 4242, "list_id": 77 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9001 })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/notes"))
            .and(body_json(json!({ "content": "Meeting Notes - x", "organization_ids": [4242] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let crm = client_for(&server);
        let org = crm.create_organization("Acme").await.unwrap();
        assert_eq!(org, "4242");
        assert_eq!(crm.add_to_pipeline(&org, 77).await.unwrap(), "9001");
        crm.attach_note(&org, "Meeting Notes - x").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_request_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .respond_with(ResponseTemplate::new(422).set_body_string("name taken"))
            .mount(&server)
            .await;

        let err = client_for(&server).create_organization("Acme").await.unwrap_err();
        assert!(matches!(err, DealScoutError::Network(_)));
        assert!(err.to_string().contains("name taken"));
    }

    #[tokio::test]
    async fn missing_id_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Acme" })))
            .mount(&server)
            .await;

        let err = client_for(&server).create_organization("Acme").await.unwrap_err();
        assert!(matches!(err, DealScoutError::Malformed { .. }));
    }
}
