//! Application configuration for DealScout.
//!
//! User config lives at `~/.dealscout/dealscout.toml`.
//! Secrets are never written to the file; it only names the environment
//! variables that carry them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DealScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dealscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dealscout";

// ---------------------------------------------------------------------------
// Config structs (matching dealscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub affinity: AffinityConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub convert: ConvertConfig,
}

/// `[watch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Folder whose documents are scanned each cycle.
    #[serde(default)]
    pub folder_id: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    /// How far back the first cycle looks when no watermark exists yet.
    #[serde(default = "default_lookback")]
    pub first_run_lookback_minutes: i64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause between documents inside one cycle.
    #[serde(default = "default_document_delay")]
    pub document_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            poll_interval_minutes: default_poll_interval(),
            first_run_lookback_minutes: default_lookback(),
            page_size: default_page_size(),
            document_delay_ms: default_document_delay(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.max(1) * 60)
    }

    pub fn document_delay(&self) -> Duration {
        Duration::from_millis(self.document_delay_ms)
    }
}

fn default_poll_interval() -> u64 {
    5
}
fn default_lookback() -> i64 {
    60
}
fn default_page_size() -> u32 {
    50
}
fn default_document_delay() -> u64 {
    2000
}

/// `[policy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The firm-side attendee present in every meeting.
    #[serde(default = "default_principal")]
    pub internal_principal: String,

    /// Tokens that disqualify an address as the founder's (matched
    /// case-insensitively against the local part).
    #[serde(default = "default_exclude_names")]
    pub exclude_names: Vec<String>,

    /// Consumer webmail domains that never name a company.
    #[serde(default = "default_personal_domains")]
    pub personal_email_domains: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            internal_principal: default_principal(),
            exclude_names: default_exclude_names(),
            personal_email_domains: default_personal_domains(),
        }
    }
}

impl PolicyConfig {
    /// First token of the principal's name, used by title patterns.
    pub fn principal_first_name(&self) -> &str {
        self.internal_principal
            .split_whitespace()
            .next()
            .unwrap_or_default()
    }
}

fn default_principal() -> String {
    "Adarsh Bhatt".into()
}
fn default_exclude_names() -> Vec<String> {
    vec!["adarsh".into()]
}
fn default_personal_domains() -> Vec<String> {
    [
        "gmail.com",
        "googlemail.com",
        "yahoo.com",
        "hotmail.com",
        "outlook.com",
        "live.com",
        "icloud.com",
        "me.com",
        "aol.com",
        "protonmail.com",
        "proton.me",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[google]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Name of the env var holding the OAuth access token.
    #[serde(default = "default_google_token_env")]
    pub token_env: String,

    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: String,

    #[serde(default = "default_docs_base_url")]
    pub docs_base_url: String,

    #[serde(default = "default_gmail_base_url")]
    pub gmail_base_url: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_env: default_google_token_env(),
            drive_base_url: default_drive_base_url(),
            docs_base_url: default_docs_base_url(),
            gmail_base_url: default_gmail_base_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_google_token_env() -> String {
    "GOOGLE_ACCESS_TOKEN".into()
}
fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".into()
}
fn default_docs_base_url() -> String {
    "https://docs.googleapis.com/v1".into()
}
fn default_gmail_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1".into()
}
fn default_http_timeout() -> u64 {
    30
}

/// `[affinity]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    #[serde(default = "default_affinity_key_env")]
    pub api_key_env: String,

    /// Pipeline list that new deals are added to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<u64>,

    #[serde(default = "default_affinity_base_url")]
    pub base_url: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_affinity_key_env(),
            list_id: None,
            base_url: default_affinity_base_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_affinity_key_env() -> String {
    "AFFINITY_API_KEY".into()
}
fn default_affinity_base_url() -> String {
    "https://api.affinity.co".into()
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Token cap for entity extraction.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Token cap for follow-up email bodies.
    #[serde(default = "default_email_max_tokens")]
    pub email_max_tokens: u32,

    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Document text beyond this many characters is cut before prompting.
    #[serde(default = "default_content_char_budget")]
    pub content_char_budget: usize,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_key_env(),
            model: default_anthropic_model(),
            base_url: default_anthropic_base_url(),
            max_tokens: default_max_tokens(),
            email_max_tokens: default_email_max_tokens(),
            timeout_secs: default_model_timeout(),
            content_char_budget: default_content_char_budget(),
        }
    }
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_email_max_tokens() -> u32 {
    600
}
fn default_model_timeout() -> u64 {
    60
}
fn default_content_char_budget() -> usize {
    12_000
}

/// `[mail]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address for follow-up drafts.
    #[serde(default)]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: String::new(),
            from_name: default_from_name(),
        }
    }
}

fn default_from_name() -> String {
    "VC Team".into()
}

/// `[state]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding the ledger, watermark and activity stats.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.dealscout/data".into()
}

/// `[convert]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Converter used to turn Word uploads into HTML.
    #[serde(default = "default_pandoc_cmd")]
    pub pandoc_cmd: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            pandoc_cmd: default_pandoc_cmd(),
        }
    }
}

fn default_pandoc_cmd() -> String {
    "pandoc".into()
}

// ---------------------------------------------------------------------------
// Runtime settings (config + resolved secrets)
// ---------------------------------------------------------------------------

/// Everything a running service needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub config: AppConfig,
    pub google_token: String,
    pub affinity_api_key: String,
    pub anthropic_api_key: String,
    /// CRM pipeline list id (validated present).
    pub list_id: u64,
    /// Expanded `[state].data_dir`.
    pub data_dir: PathBuf,
}

/// Check that everything `run`/`once` depends on is present and resolve
/// secrets from the environment.
pub fn validate_for_run(config: &AppConfig) -> Result<RuntimeSettings> {
    if config.watch.folder_id.trim().is_empty() {
        return Err(DealScoutError::config(
            "no folder to watch. Set [watch].folder_id in the config file.",
        ));
    }
    let list_id = config.affinity.list_id.ok_or_else(|| {
        DealScoutError::config("no CRM pipeline list. Set [affinity].list_id in the config file.")
    })?;
    if config.mail.from_email.trim().is_empty() {
        return Err(DealScoutError::config(
            "no sender address for drafts. Set [mail].from_email in the config file.",
        ));
    }

    let google_token = resolve_secret(&config.google.token_env, "Google access token")?;
    let affinity_api_key = resolve_secret(&config.affinity.api_key_env, "Affinity API key")?;
    let anthropic_api_key = resolve_secret(&config.anthropic.api_key_env, "Anthropic API key")?;

    Ok(RuntimeSettings {
        config: config.clone(),
        google_token,
        affinity_api_key,
        anthropic_api_key,
        list_id,
        data_dir: expand_home(&config.state.data_dir)?,
    })
}

/// Read a secret from the named env var, rejecting empty values.
pub fn resolve_secret(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(DealScoutError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| DealScoutError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None if path == "~" => {
            dirs::home_dir().ok_or_else(|| DealScoutError::config("could not determine home directory"))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dealscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DealScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dealscout/dealscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DealScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DealScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    write_default_config(&path)?;
    Ok(path)
}

/// Write the default config to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| DealScoutError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DealScoutError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| DealScoutError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}
