//! Shared types, error model, and configuration for DealScout.
//!
//! This crate is the foundation depended on by all other DealScout crates.
//! It provides:
//! - [`DealScoutError`], the unified error type
//! - Domain types ([`DocumentRef`], [`RawExtraction`], [`EntityRecord`], [`LedgerEntry`])
//! - Configuration ([`AppConfig`], [`RuntimeSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AffinityConfig, AnthropicConfig, AppConfig, ConvertConfig, GoogleConfig, MailConfig,
    PolicyConfig, RuntimeSettings, StateConfig, WatchConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, resolve_secret, validate_for_run,
    write_default_config,
};
pub use error::{DealScoutError, Result};
pub use types::{
    CandidateSource, DocumentRef, EntityRecord, ExtractedEmail, FounderCandidate, LedgerEntry,
    LinkSource, MimeKind, NATIVE_DOC_MIME, RawExtraction, TitleHint, WORD_DOC_MIME,
};
