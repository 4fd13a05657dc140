//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dealscout_core::resolver::resolve;
use dealscout_core::{CycleSummary, Pipeline, ProgressReporter, StageFailure, run_forever};
use dealscout_extract::{ContentExtractor, LocalBody};
use dealscout_shared::{
    AppConfig, FounderCandidate, LinkSource, RawExtraction, TitleHint, expand_home,
    config_file_path, load_config, load_config_from, validate_for_run, write_default_config,
};
use dealscout_storage::{Ledger, StatePaths, StatsStore, WatermarkStore};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DealScout: meeting notes in, CRM deals and follow-up drafts out.
#[derive(Parser)]
#[command(
    name = "dealscout",
    version,
    about = "Watch a meeting-notes folder and turn founder meetings into CRM deals.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.dealscout/dealscout.toml).
    #[arg(long, global = true, env = "DEALSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Poll the folder until interrupted.
    Run {
        /// Override `[watch].poll_interval_minutes`.
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Run a single cycle and exit.
    Once {
        /// Print the cycle summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract emails and the founder candidate from a local file. No network.
    Extract {
        /// Document body: native JSON, HTML, plain text, or .docx.
        file: PathBuf,

        /// Document title (defaults to the file stem).
        #[arg(short, long)]
        title: Option<String>,

        /// Input format (defaults to a guess from the extension).
        #[arg(short, long)]
        format: Option<InputFormat>,

        /// Include the flattened plain text in the output.
        #[arg(long)]
        with_text: bool,
    },

    /// Inspect the processed-document ledger.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Show state files, today's activity and credential presence.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Ledger subcommands.
#[derive(Subcommand)]
pub(crate) enum LedgerAction {
    /// Most recently processed documents first.
    List {
        /// Maximum rows to print.
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

/// Local input formats for `extract`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum InputFormat {
    Native,
    Html,
    Text,
    Docx,
}

impl InputFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Native),
            "html" | "htm" => Ok(Self::Html),
            "txt" | "md" => Ok(Self::Text),
            "docx" => Ok(Self::Docx),
            _ => Err(eyre!(
                "cannot guess the format of '{}'; pass --format native|html|text|docx",
                path.display()
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dealscout=info",
        1 => "dealscout=debug",
        _ => "dealscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { interval_minutes } => cmd_run(config_path, interval_minutes).await,
        Command::Once { json } => cmd_once(config_path, json).await,
        Command::Extract {
            file,
            title,
            format,
            with_text,
        } => cmd_extract(config_path, &file, title.as_deref(), format, with_text).await,
        Command::Ledger { action } => match action {
            LedgerAction::List { limit, json } => cmd_ledger_list(config_path, limit, json),
        },
        Command::Status => cmd_status(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(config_path, force),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn state_paths(config: &AppConfig) -> Result<(PathBuf, StatePaths)> {
    let data_dir = expand_home(&config.state.data_dir)?;
    let paths = StatePaths::in_dir(&data_dir);
    Ok((data_dir, paths))
}

// ---------------------------------------------------------------------------
// Service commands
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, interval_minutes: Option<u64>) -> Result<()> {
    let config = load(config_path)?;
    let settings = validate_for_run(&config)?;
    let pipeline = Pipeline::from_settings(&settings)?;

    let interval = interval_minutes
        .map(|m| Duration::from_secs(m.max(1) * 60))
        .unwrap_or_else(|| config.watch.poll_interval());

    info!(
        folder = %config.watch.folder_id,
        data_dir = %settings.data_dir.display(),
        "starting watcher"
    );
    println!("Watching for new meeting notes. Press Ctrl-C to stop.");

    let reporter = CliProgress::new();
    let cycles = run_forever(&pipeline, interval, &reporter).await?;
    println!("Stopped after {cycles} cycle(s).");
    Ok(())
}

async fn cmd_once(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let settings = validate_for_run(&config)?;
    let pipeline = Pipeline::from_settings(&settings)?;

    let summary = if json {
        pipeline.run_cycle(&dealscout_core::SilentProgress).await?
    } else {
        pipeline.run_cycle(&CliProgress::new()).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &CycleSummary) {
    println!();
    println!("  Cycle {}", summary.cycle_id);
    println!("  Discovered: {}", summary.discovered);
    println!("  Recorded:   {}", summary.recorded);
    println!("  Deals:      {}", summary.deals_created);
    println!("  Drafts:     {}", summary.drafts_created);
    println!("  Failed:     {}", summary.failed);
    for failure in &summary.failures {
        println!(
            "    - {} ({}) at {}: {}",
            failure.document_name, failure.document_id, failure.stage, failure.error
        );
    }
    println!("  Next check from {}", summary.next_high_water_mark.to_rfc3339());
    println!();
}

// ---------------------------------------------------------------------------
// Offline extraction
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ExtractReport<'a> {
    title: &'a str,
    link_source: LinkSource,
    emails: &'a [dealscout_shared::ExtractedEmail],
    title_hint: Option<&'a TitleHint>,
    candidate: &'a FounderCandidate,
    #[serde(skip_serializing_if = "Option::is_none")]
    plain_text: Option<&'a str>,
}

async fn cmd_extract(
    config_path: Option<&Path>,
    file: &Path,
    title: Option<&str>,
    format: Option<InputFormat>,
    with_text: bool,
) -> Result<()> {
    let config = load(config_path)?;
    let format = match format {
        Some(f) => f,
        None => InputFormat::from_path(file)?,
    };
    let title = title.map(String::from).unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let data = std::fs::read(file).map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let extractor = ContentExtractor::new(&config.policy, &config.convert.pandoc_cmd)?;

    info!(file = %file.display(), ?format, "extracting");
    let raw: RawExtraction = match format {
        InputFormat::Docx => extractor.extract_word_bytes(&title, &data).await?,
        InputFormat::Native => {
            let json: serde_json::Value = serde_json::from_slice(&data)?;
            extractor.extract_local(&title, LocalBody::Native(json)).await?
        }
        InputFormat::Html => {
            let html = String::from_utf8_lossy(&data).into_owned();
            extractor.extract_local(&title, LocalBody::Html(html)).await?
        }
        InputFormat::Text => {
            let text = String::from_utf8_lossy(&data).into_owned();
            extractor.extract_local(&title, LocalBody::PlainText(text)).await?
        }
    };

    let candidate = resolve(&raw, &config.policy.exclude_names);
    let report = ExtractReport {
        title: &raw.title,
        link_source: raw.link_source,
        emails: &raw.emails,
        title_hint: raw.title_hint.as_ref(),
        candidate: &candidate,
        plain_text: with_text.then_some(raw.plain_text.as_str()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// State inspection
// ---------------------------------------------------------------------------

fn cmd_ledger_list(config_path: Option<&Path>, limit: usize, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let (_, paths) = state_paths(&config)?;
    let ledger = Ledger::open(&paths.ledger)?;
    let entries: Vec<_> = ledger.recent().into_iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No documents processed yet ({}).", paths.ledger.display());
        return Ok(());
    }

    println!(
        "{:<20}  {:<24}  {:<24}  {:<6}  {:<6}",
        "PROCESSED", "FOUNDER", "DEAL", "DEAL", "DRAFT"
    );
    for entry in &entries {
        println!(
            "{:<20}  {:<24}  {:<24}  {:<6}  {:<6}",
            entry.processed_at.format("%Y-%m-%d %H:%M:%S"),
            clip(&entry.founder_name, 24),
            clip(entry.deal_name.as_deref().unwrap_or("-"), 24),
            yes_no(entry.derived_deal_id.is_some()),
            yes_no(entry.derived_draft_id.is_some()),
        );
    }
    println!();
    println!("  {} of {} entries", entries.len(), ledger.len());
    Ok(())
}

fn cmd_status(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let (data_dir, paths) = state_paths(&config)?;
    let now = Utc::now();

    let last_check = WatermarkStore::new(&paths.watermark).load()?;
    let ledger = Ledger::open(&paths.ledger)?;
    let stats = StatsStore::new(&paths.stats).load(now)?;

    println!();
    println!("  Folder:      {}", or_unset(&config.watch.folder_id));
    println!(
        "  Pipeline:    {}",
        config
            .affinity
            .list_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(unset)".into())
    );
    println!("  Data dir:    {}", data_dir.display());
    println!(
        "  Last check:  {}",
        last_check
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into())
    );
    println!("  Ledger:      {} document(s)", ledger.len());
    println!();
    println!("  Today ({})", stats.date);
    println!("    Processed: {}", stats.processed_today);
    println!("    Deals:     {}", stats.deals_created);
    println!("    Drafts:    {}", stats.drafts_created);
    println!("    Failed:    {}", stats.failed_today);
    println!();
    for (label, var) in [
        ("Google token", &config.google.token_env),
        ("Affinity key", &config.affinity.api_key_env),
        ("Anthropic key", &config.anthropic.api_key_env),
    ] {
        let present = std::env::var(var).is_ok_and(|v| !v.trim().is_empty());
        println!(
            "  {label:<14} ${var} {}",
            if present { "set" } else { "MISSING" }
        );
    }
    println!();
    Ok(())
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn or_unset(s: &str) -> &str {
    if s.trim().is_empty() { "(unset)" } else { s }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if path.exists() && !force {
        return Err(eyre!(
            "config already exists at '{}'; pass --force to overwrite",
            path.display()
        ));
    }
    write_default_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner, one per cycle.
struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        let spinner = slot.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        f(spinner);
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.with_spinner(|s| s.set_message(name.to_string()));
    }

    fn document_started(&self, name: &str, current: usize, total: usize) {
        self.with_spinner(|s| s.set_message(format!("Processing [{current}/{total}] {name}")));
    }

    fn document_failed(&self, name: &str, failure: &StageFailure) {
        self.with_spinner(|s| s.println(format!("  ✗ {name}: {failure}")));
    }

    fn done(&self, summary: &CycleSummary) {
        if let Some(spinner) = self.spinner.lock().ok().and_then(|mut slot| slot.take()) {
            spinner.finish_and_clear();
        }
        info!(
            recorded = summary.recorded,
            failed = summary.failed,
            "cycle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.json")).unwrap(), InputFormat::Native);
        assert_eq!(InputFormat::from_path(Path::new("a.HTM")).unwrap(), InputFormat::Html);
        assert_eq!(InputFormat::from_path(Path::new("a.txt")).unwrap(), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("a.docx")).unwrap(), InputFormat::Docx);
        assert!(InputFormat::from_path(Path::new("a.pdf")).is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["dealscout", "-vv", "ledger", "list", "-n", "5"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Ledger {
                action: LedgerAction::List { limit: 5, json: false }
            }
        ));

        let cli = Cli::try_parse_from(["dealscout", "extract", "notes.html", "--format", "html"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Extract {
                format: Some(InputFormat::Html),
                ..
            }
        ));
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dealscout.toml");
        cmd_config_init(Some(&path), false).unwrap();
        assert!(cmd_config_init(Some(&path), false).is_err());
        cmd_config_init(Some(&path), true).unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.watch.poll_interval_minutes, 5);
    }

    #[tokio::test]
    async fn extracts_plain_text_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("dealscout.toml");
        cmd_config_init(Some(&config_path), false).unwrap();
        let notes = dir.path().join("Jane Doe and Adarsh.txt");
        std::fs::write(&notes, "Invited\nJane Doe jane@acme.io\nMeeting notes\n").unwrap();

        cmd_extract(Some(&config_path), &notes, None, None, false)
            .await
            .unwrap();
    }

    #[test]
    fn clips_long_names() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
    }
}
