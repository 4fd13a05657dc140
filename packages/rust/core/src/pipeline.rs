//! Pipeline driver: one cycle over the documents the change detector returns.
//!
//! Each document walks
//! `Discovered → ContentExtracted → Resolved → EntitiesExtracted → Named →
//! SideEffected → Recorded`. A failure at any edge fails that document only;
//! the batch continues and nothing is written to the ledger for it.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dealscout_discovery::{DocumentStore, DriveClient, find_candidates, initial_high_water_mark};
use dealscout_extract::ContentExtractor;
use dealscout_services::{AffinityClient, AnthropicClient, Crm, GmailClient, MailDrafter, TextGenerator};
use dealscout_shared::{
    DealScoutError, DocumentRef, LedgerEntry, Result, RuntimeSettings,
};
use dealscout_storage::{CycleDelta, Ledger, StatePaths, StatsStore, WatermarkStore};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::{EntityExtractor, EntityPromptSettings};
use crate::followup::{FollowupDrafter, note_content};
use crate::naming::derive_deal_name;
use crate::resolver::resolve;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Per-document processing states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovered,
    ContentExtracted,
    Resolved,
    EntitiesExtracted,
    Named,
    SideEffected,
    Recorded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::ContentExtracted => "content_extracted",
            Self::Resolved => "resolved",
            Self::EntitiesExtracted => "entities_extracted",
            Self::Named => "named",
            Self::SideEffected => "side_effected",
            Self::Recorded => "recorded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document that failed on its way into `stage`.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: DealScoutError,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One failed document in a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub document_id: String,
    pub document_name: String,
    pub stage: Stage,
    pub error: String,
}

/// Totals for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub high_water_mark: DateTime<Utc>,
    pub next_high_water_mark: DateTime<Utc>,
    pub discovered: usize,
    pub recorded: usize,
    pub failed: usize,
    pub deals_created: usize,
    pub drafts_created: usize,
    pub failures: Vec<DocumentFailure>,
}

/// What happened to one successfully recorded document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub entry: LedgerEntry,
    /// A pipeline entry was created by this pass.
    pub deal_created: bool,
    /// A follow-up draft was created by this pass.
    pub draft_created: bool,
}

/// Progress callback for reporting cycle status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each document.
    fn document_started(&self, name: &str, current: usize, total: usize);
    /// Called when a document fails.
    fn document_failed(&self, name: &str, failure: &StageFailure);
    /// Called when the cycle completes.
    fn done(&self, summary: &CycleSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn document_failed(&self, _name: &str, _failure: &StageFailure) {}
    fn done(&self, _summary: &CycleSummary) {}
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the driver needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub folder_id: String,
    pub list_id: u64,
    pub exclude_names: Vec<String>,
    pub personal_domains: Vec<String>,
    pub first_run_lookback_minutes: i64,
    pub document_delay: Duration,
    pub entity_prompt: EntityPromptSettings,
    pub email_max_tokens: u32,
    pub from_name: String,
    pub state: StatePaths,
}

impl PipelineOptions {
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        let config = &settings.config;
        Self {
            folder_id: config.watch.folder_id.clone(),
            list_id: settings.list_id,
            exclude_names: config.policy.exclude_names.clone(),
            personal_domains: config.policy.personal_email_domains.clone(),
            first_run_lookback_minutes: config.watch.first_run_lookback_minutes,
            document_delay: config.watch.document_delay(),
            entity_prompt: EntityPromptSettings {
                internal_principal: config.policy.internal_principal.clone(),
                exclude_names: config.policy.exclude_names.clone(),
                max_tokens: config.anthropic.max_tokens,
                content_char_budget: config.anthropic.content_char_budget,
            },
            email_max_tokens: config.anthropic.email_max_tokens,
            from_name: config.mail.from_name.clone(),
            state: StatePaths::in_dir(&settings.data_dir),
        }
    }
}

/// External services the driver talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn DocumentStore>,
    pub crm: Arc<dyn Crm>,
    pub mail: Arc<dyn MailDrafter>,
    pub generator: Arc<dyn TextGenerator>,
}

impl Collaborators {
    /// Production REST clients.
    pub fn from_settings(settings: &RuntimeSettings) -> Result<Self> {
        let config = &settings.config;
        Ok(Self {
            store: Arc::new(DriveClient::new(
                &config.google,
                &settings.google_token,
                config.watch.page_size,
            )?),
            crm: Arc::new(AffinityClient::new(&config.affinity, &settings.affinity_api_key)?),
            mail: Arc::new(GmailClient::new(&config.google, &config.mail, &settings.google_token)?),
            generator: Arc::new(AnthropicClient::new(
                &config.anthropic,
                &settings.anthropic_api_key,
            )?),
        })
    }
}

/// Mark to persist after a cycle.
///
/// With no failures the mark moves to the cycle start. Otherwise it stops
/// just short of the oldest failed document so that document is listed again.
pub fn next_high_water_mark(
    cycle_start: DateTime<Utc>,
    failed_modified_at: impl IntoIterator<Item = DateTime<Utc>>,
) -> DateTime<Utc> {
    failed_modified_at
        .into_iter()
        .map(|t| t - chrono::Duration::microseconds(1))
        .fold(cycle_start, DateTime::min)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Pipeline {
    options: PipelineOptions,
    collaborators: Collaborators,
    extractor: ContentExtractor,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        collaborators: Collaborators,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            options,
            collaborators,
            extractor,
        }
    }

    /// Wire the production clients from resolved settings.
    pub fn from_settings(settings: &RuntimeSettings) -> Result<Self> {
        let config = &settings.config;
        Ok(Self::new(
            PipelineOptions::from_settings(settings),
            Collaborators::from_settings(settings)?,
            ContentExtractor::new(&config.policy, &config.convert.pandoc_cmd)?,
        ))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run one detection + processing cycle.
    ///
    /// Errors here are cycle-level (store listing, state files); per-document
    /// errors are folded into the summary.
    #[instrument(skip_all, fields(folder = %self.options.folder_id))]
    pub async fn run_cycle(&self, progress: &dyn ProgressReporter) -> Result<CycleSummary> {
        let started = Instant::now();
        let cycle_id = Uuid::now_v7();
        let cycle_start = Utc::now();
        let paths = &self.options.state;

        progress.phase("Loading state");
        let mut ledger = Ledger::open(&paths.ledger)?;
        let watermark = WatermarkStore::new(&paths.watermark);
        let mark = match watermark.load()? {
            Some(mark) => mark,
            None => {
                let mark = initial_high_water_mark(cycle_start, self.options.first_run_lookback_minutes);
                info!(%mark, "no previous check recorded, using lookback window");
                mark
            }
        };

        progress.phase("Checking for new documents");
        let candidates = find_candidates(
            self.collaborators.store.as_ref(),
            &self.options.folder_id,
            mark,
            &ledger,
        )
        .await?;

        let total = candidates.len();
        let mut recorded = Vec::new();
        let mut failed: Vec<(&DocumentRef, StageFailure)> = Vec::new();

        for (i, doc) in candidates.iter().enumerate() {
            if i > 0 && !self.options.document_delay.is_zero() {
                tokio::time::sleep(self.options.document_delay).await;
            }
            progress.document_started(&doc.name, i + 1, total);

            match self.process_document(doc, &mut ledger).await {
                Ok(outcome) => recorded.push(outcome),
                Err(failure) => {
                    error!(
                        document_id = %doc.id,
                        stage = %failure.stage,
                        error = %failure.error,
                        "document failed"
                    );
                    progress.document_failed(&doc.name, &failure);
                    failed.push((doc, failure));
                }
            }
        }

        let next_mark = next_high_water_mark(cycle_start, failed.iter().map(|(d, _)| d.modified_at));
        watermark.store(next_mark)?;

        let deals_created = recorded.iter().filter(|o| o.deal_created).count();
        let drafts_created = recorded.iter().filter(|o| o.draft_created).count();

        let summary = CycleSummary {
            cycle_id,
            started_at: cycle_start,
            high_water_mark: mark,
            next_high_water_mark: next_mark,
            discovered: total,
            recorded: recorded.len(),
            failed: failed.len(),
            deals_created,
            drafts_created,
            failures: failed
                .iter()
                .map(|(doc, f)| DocumentFailure {
                    document_id: doc.id.clone(),
                    document_name: doc.name.clone(),
                    stage: f.stage,
                    error: f.error.to_string(),
                })
                .collect(),
        };

        let stats = StatsStore::new(&paths.stats);
        if let Err(e) = stats.record_cycle(
            Utc::now(),
            CycleDelta {
                processed: summary.recorded as u32,
                deals_created: deals_created as u32,
                drafts_created: drafts_created as u32,
                failed: summary.failed as u32,
            },
        ) {
            warn!(error = %e, "could not update activity stats");
        }

        info!(
            %cycle_id,
            discovered = summary.discovered,
            recorded = summary.recorded,
            failed = summary.failed,
            deals = summary.deals_created,
            drafts = summary.drafts_created,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
        progress.done(&summary);
        Ok(summary)
    }

    /// Drive one document through every stage.
    #[instrument(skip_all, fields(document_id = %doc.id, name = %doc.name))]
    pub async fn process_document(
        &self,
        doc: &DocumentRef,
        ledger: &mut Ledger,
    ) -> std::result::Result<DocumentOutcome, StageFailure> {
        let c = &self.collaborators;

        let raw = self
            .extractor
            .extract(c.store.as_ref(), doc)
            .await
            .at(Stage::ContentExtracted)?;

        let candidate = resolve(&raw, &self.options.exclude_names);

        let record = EntityExtractor::new(c.generator.as_ref(), &self.options.entity_prompt)
            .extract_entities(&raw.plain_text, &raw.title, &candidate, raw.title_hint.as_ref())
            .await
            .at(Stage::EntitiesExtracted)?;

        // An updated document keeps the organization, deal and draft it
        // already has; only the note is attached again.
        let previous = ledger.get(&doc.id).cloned();
        let deal_name = previous
            .as_ref()
            .and_then(|p| p.deal_name.clone())
            .unwrap_or_else(|| derive_deal_name(&record, &self.options.personal_domains));
        info!(%deal_name, founder = %record.founder_name, update = previous.is_some(), "deal named");

        // Organization creation is the one side effect that must not repeat,
        // so everything after it is recorded even if it partially fails.
        let org_id = match previous.as_ref().and_then(|p| p.organization_id.clone()) {
            Some(id) => {
                debug!(org_id = %id, "reusing recorded organization");
                id
            }
            None => c
                .crm
                .create_organization(&deal_name)
                .await
                .at(Stage::SideEffected)?,
        };

        let mut deal_created = false;
        let deal_id = match previous.as_ref().and_then(|p| p.derived_deal_id.clone()) {
            Some(id) => Some(id),
            None => match c.crm.add_to_pipeline(&org_id, self.options.list_id).await {
                Ok(id) => {
                    deal_created = true;
                    Some(id)
                }
                Err(e) => {
                    warn!(%org_id, error = %e, "organization created but pipeline entry failed");
                    None
                }
            },
        };

        let note = note_content(
            &raw.title,
            &record,
            &raw.plain_text,
            self.options.entity_prompt.content_char_budget,
        );
        if let Err(e) = c.crm.attach_note(&org_id, &note).await {
            warn!(%org_id, error = %e, "meeting note not attached");
        }

        let mut draft_created = false;
        let draft_id = match previous.as_ref().and_then(|p| p.derived_draft_id.clone()) {
            Some(id) => Some(id),
            None => {
                let drafter = FollowupDrafter {
                    generator: c.generator.as_ref(),
                    mail: c.mail.as_ref(),
                    max_tokens: self.options.email_max_tokens,
                    from_name: &self.options.from_name,
                };
                match drafter.draft(&record, &raw.title).await {
                    Ok(id) => {
                        draft_created = id.is_some();
                        id
                    }
                    Err(e) => {
                        warn!(error = %e, "follow-up draft failed");
                        None
                    }
                }
            }
        };

        let entry = LedgerEntry {
            document_id: doc.id.clone(),
            document_name: doc.name.clone(),
            founder_name: record.founder_name.clone(),
            company_name: record.company_name.clone(),
            deal_name: Some(deal_name),
            organization_id: Some(org_id),
            derived_deal_id: deal_id,
            derived_draft_id: draft_id,
            processed_at: Utc::now(),
        };
        ledger.upsert(entry.clone()).at(Stage::Recorded)?;

        info!(
            founder = %entry.founder_name,
            deal = entry.derived_deal_id.as_deref(),
            draft = entry.derived_draft_id.as_deref(),
            "document recorded"
        );
        Ok(DocumentOutcome {
            entry,
            deal_created,
            draft_created,
        })
    }
}
