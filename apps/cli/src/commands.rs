//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use linkforge_core::pipeline::{
    CorpusScan, PipelineConfig, ProgressReporter, rewrite_corpus, scan_corpus, sync_corpus,
};
use linkforge_core::rewrite::apply_transforms;
use linkforge_core::sync::partition;
use linkforge_networks::NetworkRegistry;
use linkforge_shared::{
    AppConfig, PersistedLink, init_config, load_config, load_config_from, resolve_api_token,
};
use linkforge_storage::{FileStore, LinkStore, RemoteStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LinkForge — route outbound links through tracked redirects.
#[derive(Parser)]
#[command(
    name = "linkforge",
    version,
    about = "Scan markdown content for outbound links, assign tracking slugs, and rewrite or sync them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to a config file (defaults to ~/.linkforge/linkforge.toml).
    #[arg(long, global = true)]
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
    /// Scan content and report the distinct links that would be tracked.
    Scan {
        /// Content directory (defaults to the configured content_dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Rewrite external links to tracking URLs (dry run unless --write).
    Rewrite {
        /// Content directory (defaults to the configured content_dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Apply rewritten content to the files on disk.
        #[arg(long)]
        write: bool,
    },

    /// Push the computed link table to the configured store.
    Sync {
        /// Content directory (defaults to the configured content_dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Show what would be created/updated without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Export the computed link table.
    Export {
        /// Content directory (defaults to the configured content_dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output format.
        #[arg(short, long)]
        format: ExportFormat,

        /// Write to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Export output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum ExportFormat {
    Json,
    Csv,
    Sql,
    Markdown,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linkforge=info",
        1 => "linkforge=debug",
        _ => "linkforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = load_cli_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan { dir } => cmd_scan(&config, dir).await,
        Command::Rewrite { dir, write } => cmd_rewrite(&config, dir, write).await,
        Command::Sync { dir, dry_run } => cmd_sync(&config, dir, dry_run).await,
        Command::Export { dir, format, out } => cmd_export(&config, dir, &format, out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn load_cli_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Scan the corpus with a spinner, shared by every content command.
fn scan_with_progress(config: &AppConfig, dir: Option<PathBuf>) -> Result<(CorpusScan, PipelineConfig)> {
    let pipeline = PipelineConfig::from_app_config(config, dir)?;
    let registry = NetworkRegistry::new();

    let reporter = CliProgress::new();
    let corpus = scan_corpus(&pipeline, &registry, &reporter)?;
    reporter.finish();

    Ok((corpus, pipeline))
}

fn link_records(corpus: &CorpusScan) -> Vec<PersistedLink> {
    corpus.links.links().map(|l| l.to_persisted()).collect()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scan(config: &AppConfig, dir: Option<PathBuf>) -> Result<()> {
    let (corpus, _) = scan_with_progress(config, dir)?;

    let affiliate_count = corpus.links.links().filter(|l| l.is_affiliate).count();
    let converted_count = corpus.links.links().filter(|l| l.is_converted).count();

    println!();
    for link in corpus.links.links() {
        let network = link.network_id.as_deref().unwrap_or("-");
        let marker = match (link.is_affiliate, link.is_converted) {
            (true, true) => "converted",
            (true, false) => "affiliate",
            _ => "plain",
        };
        println!("  {:40} {:12} {:10} {}", link.slug, network, marker, link.canonical_url);
    }

    println!();
    println!("  Files scanned:  {}", corpus.documents.len());
    println!("  Distinct links: {}", corpus.links.len());
    println!("  Affiliate:      {affiliate_count} ({converted_count} converted)");
    println!();

    Ok(())
}

async fn cmd_rewrite(config: &AppConfig, dir: Option<PathBuf>, write: bool) -> Result<()> {
    let (corpus, pipeline) = scan_with_progress(config, dir)?;
    let registry = NetworkRegistry::new();

    let results = rewrite_corpus(&corpus, &pipeline, &registry);

    if results.is_empty() {
        println!("No documents need rewriting.");
        return Ok(());
    }

    println!();
    for result in &results {
        println!("  {:50} {} change(s)", result.file.display().to_string(), result.change_count);
        for change in &result.changes {
            println!("    {} -> {}", change.original_url, change.tracking_url);
        }
    }
    println!();

    if write {
        let written = apply_transforms(&results)?;
        info!(written, "applied rewrites");
        println!("  Wrote {written} file(s).");
    } else {
        println!("  Dry run: pass --write to apply these changes.");
    }
    println!();

    Ok(())
}

async fn cmd_sync(config: &AppConfig, dir: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let (corpus, _) = scan_with_progress(config, dir)?;
    let store = make_store(config)?;

    if dry_run {
        let snapshot = store.list().await?;
        let plan = partition(&corpus.links, &snapshot);
        println!();
        println!("  Dry run against {} stored record(s):", snapshot.len());
        println!("  Would create: {}", plan.new.len());
        println!("  Would update: {}", plan.updated.len());
        println!();
        return Ok(());
    }

    let report = sync_corpus(&corpus, store.as_ref()).await?;

    println!();
    println!("  Sync complete.");
    println!("  Created: {}", report.created);
    println!("  Updated: {}", report.updated);
    println!();

    Ok(())
}

async fn cmd_export(
    config: &AppConfig,
    dir: Option<PathBuf>,
    format: &ExportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let (corpus, _) = scan_with_progress(config, dir)?;
    let records = link_records(&corpus);

    let rendered = match format {
        ExportFormat::Json => linkforge_exports::to_json(&records)?,
        ExportFormat::Csv => linkforge_exports::to_csv(&records),
        ExportFormat::Sql => linkforge_exports::to_sql(&records),
        ExportFormat::Markdown => linkforge_exports::to_markdown(&records),
    };

    match out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
            println!("Exported {} record(s) to {}", records.len(), path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Store selection
// ---------------------------------------------------------------------------

/// Build the configured persistence backend.
fn make_store(config: &AppConfig) -> Result<Box<dyn LinkStore>> {
    match config.storage.backend.as_str() {
        "file" => Ok(Box::new(FileStore::new(&config.storage.file_path))),
        "remote" => {
            if config.storage.remote_url.is_empty() || config.storage.remote_table.is_empty() {
                return Err(eyre!(
                    "remote storage requires [storage] remote_url and remote_table"
                ));
            }
            let token = resolve_api_token(config)?;
            Ok(Box::new(RemoteStore::new(
                &config.storage.remote_url,
                token,
                &config.storage.remote_table,
            )))
        }
        other => Err(eyre!(
            "unknown storage backend '{other}': expected 'file' or 'remote'"
        )),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_scanned(&self, path: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Scanning [{current}/{total}] {path}"
        ));
    }
}
