//! In-memory collaborators for driver and scheduler tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealscout_discovery::{DocumentStore, ExportFormat};
use dealscout_extract::ContentExtractor;
use dealscout_services::{Crm, MailDrafter, TextGenerator};
use dealscout_shared::{DealScoutError, DocumentRef, MimeKind, PolicyConfig, Result};
use dealscout_storage::StatePaths;
use serde_json::json;
use tempfile::TempDir;

use crate::entities::EntityPromptSettings;
use crate::pipeline::{Collaborators, Pipeline, PipelineOptions};

pub fn doc_ref(id: &str, minutes_ago: i64) -> DocumentRef {
    let at = Utc::now() - chrono::Duration::minutes(minutes_ago);
    DocumentRef {
        id: id.into(),
        name: format!("Jane Doe and Adarsh ({id})"),
        mime_kind: MimeKind::NativeDoc,
        created_at: at,
        modified_at: at,
    }
}

#[derive(Default)]
pub struct FakeStore {
    docs: Mutex<Vec<DocumentRef>>,
    failing: Mutex<HashSet<String>>,
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn list_documents(&self, _folder: &str, since: DateTime<Utc>) -> Result<Vec<DocumentRef>> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.iter().filter(|d| d.modified_at > since).cloned().collect())
    }

    async fn get_document_body(&self, id: &str) -> Result<serde_json::Value> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(DealScoutError::Network(format!("{id}: connection reset")));
        }
        Ok(json!({ "title": id, "body": { "content": [
            { "paragraph": { "elements": [{ "textRun": { "content": "Invited\n" } }] } },
            { "paragraph": { "elements": [
                { "textRun": { "content": "Jane Doe", "textStyle": { "link": { "url": "mailto:jane@acme.io" } } } },
                { "textRun": { "content": " " } },
                { "textRun": { "content": "Adarsh", "textStyle": { "link": { "url": "mailto:adarsh@fund.vc" } } } }
            ] } },
            { "paragraph": { "elements": [{ "textRun": { "content": "Meeting notes\n" } }] } },
            { "paragraph": { "elements": [{ "textRun": { "content": "Acme builds payroll for clinics.\n" } }] } }
        ] } }))
    }

    async fn export_as(&self, id: &str, _format: ExportFormat) -> Result<Vec<u8>> {
        Err(DealScoutError::Network(format!("{id}: export not available")))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        Err(DealScoutError::Network(format!("{id}: download not available")))
    }
}

#[derive(Default)]
pub struct FakeCrm {
    orgs: AtomicUsize,
    deals: AtomicUsize,
    notes: AtomicUsize,
    fail_pipeline: Mutex<bool>,
}

#[async_trait]
impl Crm for FakeCrm {
    async fn create_organization(&self, _name: &str) -> Result<String> {
        let n = self.orgs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("org-{n}"))
    }

    async fn add_to_pipeline(&self, _org_id: &str, _list_id: u64) -> Result<String> {
        if *self.fail_pipeline.lock().unwrap() {
            return Err(DealScoutError::Network("list entry rejected".into()));
        }
        let n = self.deals.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("deal-{n}"))
    }

    async fn attach_note(&self, _org_id: &str, _text: &str) -> Result<()> {
        self.notes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMail {
    drafts: AtomicUsize,
    fail: Mutex<bool>,
}

#[async_trait]
impl MailDrafter for FakeMail {
    async fn create_draft(&self, _to: &str, _subject: &str, _body: &str) -> Result<String> {
        if *self.fail.lock().unwrap() {
            return Err(DealScoutError::Network("draft quota exceeded".into()));
        }
        let n = self.drafts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("draft-{n}"))
    }
}

pub struct FakeGenerator {
    reply: Mutex<String>,
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        Ok(self.reply.lock().unwrap().clone())
    }
}

/// A temp state directory plus one of each fake.
pub struct FakeWorld {
    dir: TempDir,
    store: Arc<FakeStore>,
    crm: Arc<FakeCrm>,
    mail: Arc<FakeMail>,
    generator: Arc<FakeGenerator>,
}

impl FakeWorld {
    pub fn new(docs: Vec<DocumentRef>) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            store: Arc::new(FakeStore {
                docs: Mutex::new(docs),
                failing: Mutex::default(),
            }),
            crm: Arc::default(),
            mail: Arc::default(),
            generator: Arc::new(FakeGenerator {
                reply: Mutex::new(
                    r#"{"founder_name": "Jane Doe", "company_name": "Acme", "next_steps": ["Send the deck"]}"#
                        .into(),
                ),
            }),
        }
    }

    pub fn paths(&self) -> StatePaths {
        StatePaths::in_dir(&self.dir.path().join("data"))
    }

    pub fn pipeline(&self) -> Pipeline {
        let policy = PolicyConfig::default();
        let options = PipelineOptions {
            folder_id: "folder-1".into(),
            list_id: 42,
            exclude_names: policy.exclude_names.clone(),
            personal_domains: policy.personal_email_domains.clone(),
            first_run_lookback_minutes: 60,
            document_delay: Duration::ZERO,
            entity_prompt: EntityPromptSettings {
                internal_principal: policy.internal_principal.clone(),
                exclude_names: policy.exclude_names.clone(),
                max_tokens: 1000,
                content_char_budget: 12_000,
            },
            email_max_tokens: 600,
            from_name: "VC Team".into(),
            state: self.paths(),
        };
        let collaborators = Collaborators {
            store: self.store.clone(),
            crm: self.crm.clone(),
            mail: self.mail.clone(),
            generator: self.generator.clone(),
        };
        let extractor = ContentExtractor::new(&policy, "pandoc").unwrap();
        Pipeline::new(options, collaborators, extractor)
    }

    pub fn docs(&self) -> Vec<DocumentRef> {
        self.store.docs.lock().unwrap().clone()
    }

    pub fn touch(&self, id: &str) {
        let mut docs = self.store.docs.lock().unwrap();
        if let Some(doc) = docs.iter_mut().find(|d| d.id == id) {
            doc.modified_at = Utc::now();
        }
    }

    pub fn fail_body_for(&self, id: &str) {
        self.store.failing.lock().unwrap().insert(id.into());
    }

    pub fn clear_failures(&self) {
        self.store.failing.lock().unwrap().clear();
        *self.crm.fail_pipeline.lock().unwrap() = false;
        *self.mail.fail.lock().unwrap() = false;
    }

    pub fn fail_pipeline_entries(&self) {
        *self.crm.fail_pipeline.lock().unwrap() = true;
    }

    pub fn fail_drafts(&self) {
        *self.mail.fail.lock().unwrap() = true;
    }

    pub fn set_model_reply(&self, reply: &str) {
        *self.generator.reply.lock().unwrap() = reply.into();
    }

    pub fn org_calls(&self) -> usize {
        self.crm.orgs.load(Ordering::SeqCst)
    }

    pub fn note_calls(&self) -> usize {
        self.crm.notes.load(Ordering::SeqCst)
    }

    /// Successful pipeline entries.
    pub fn deal_calls(&self) -> usize {
        self.crm.deals.load(Ordering::SeqCst)
    }

    /// Successful drafts.
    pub fn draft_calls(&self) -> usize {
        self.mail.drafts.load(Ordering::SeqCst)
    }
}
