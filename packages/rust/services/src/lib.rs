//! External collaborators: CRM, mail drafts, and text generation.
//!
//! Each concern is a trait so the pipeline can be driven by fakes in tests;
//! the REST clients here are the production implementations.

mod affinity;
mod anthropic;
mod gmail;
mod http;

use async_trait::async_trait;
use dealscout_shared::Result;

pub use affinity::AffinityClient;
pub use anthropic::AnthropicClient;
pub use gmail::{GmailClient, build_message};

/// Deal tracking. Organization creation is not idempotent on the remote side.
#[async_trait]
pub trait Crm: Send + Sync {
    /// Returns the new organization id.
    async fn create_organization(&self, name: &str) -> Result<String>;

    /// Returns the pipeline entry (deal) id.
    async fn add_to_pipeline(&self, org_id: &str, list_id: u64) -> Result<String>;

    async fn attach_note(&self, org_id: &str, text: &str) -> Result<()>;
}

#[async_trait]
pub trait MailDrafter: Send + Sync {
    /// Returns the draft id.
    async fn create_draft(&self, to: &str, subject: &str, body: &str) -> Result<String>;
}

/// Black-box prompt completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}
