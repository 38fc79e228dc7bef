//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tokio::sync::watch;
use tracing::info;

use parlwatch_core::{CycleReport, Dispatch, Monitor, Scheduler, export_to_json};
use parlwatch_shared::{AppConfig, init_config, load_config, load_config_from};
use parlwatch_storage::Store;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// parlwatch — monitor parliamentary publications and raise keyword alerts.
#[derive(Parser)]
#[command(
    name = "parlwatch",
    version,
    about = "Watch parliamentary pages for new documents and raise keyword alerts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.parlwatch/parlwatch.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Run one full monitoring cycle now and report new documents.
    Run,

    /// Run on schedule until interrupted (ctrl-c).
    Watch,

    /// Export recent documents and alerts to a JSON snapshot.
    Export {
        /// Output file path.
        #[arg(short, long, default_value = "parliament_data.json")]
        output: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "warn,parlwatch_cli={level},parlwatch_core={level},parlwatch_scrape={level},\
         parlwatch_classify={level},parlwatch_storage={level},parlwatch_notify={level},\
         parlwatch_shared={level}"
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run => cmd_run(config).await,
        Command::Watch => cmd_watch(config).await,
        Command::Export { output } => cmd_export(config, &output).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Load config from an explicit path, or from the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_run(config: AppConfig) -> Result<()> {
    let monitor = Monitor::new(config).await?;
    let report = monitor.run_cycle().await?;
    print_report(&report);
    Ok(())
}

async fn cmd_watch(config: AppConfig) -> Result<()> {
    let monitor = Monitor::new(config).await?;
    let scheduler = Scheduler::new(monitor);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down after current step");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await?;
    Ok(())
}

async fn cmd_export(config: AppConfig, output: &Path) -> Result<()> {
    let store = Store::open(Path::new(&config.database.path)).await?;
    let data = export_to_json(&store, &config, output).await?;

    println!(
        "Exported {} documents and {} alerts to {}",
        data.documents.len(),
        data.alerts.len(),
        output.display()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created default config at {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Print a human-readable cycle summary.
fn print_report(report: &CycleReport) {
    println!(
        "Cycle {} complete: {} pages scraped, {} failed, {:.1}s",
        report.cycle_id,
        report.pages_scraped,
        report.pages_failed,
        report.elapsed.as_secs_f64()
    );

    if report.new_documents.is_empty() {
        println!("No new relevant documents.");
    } else {
        println!("{} new relevant documents:", report.new_documents.len());
        for doc in &report.new_documents {
            println!(
                "  [{}] {} ({})",
                doc.alert_level.as_str(),
                doc.title,
                doc.document_type.as_str()
            );
        }
    }

    match &report.dispatch {
        Some(Dispatch::Sent { count }) => println!("Digest sent covering {count} alerts."),
        Some(Dispatch::Disabled) => println!("Notifications disabled; alerts queued."),
        None => println!("No digest sent."),
    }
}
