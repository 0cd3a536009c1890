//! gapbf - Android lock-pattern brute forcer
//!
//! CLI entry point: previews, counts and resumable brute-force runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gapbf::cli::{Cli, Command, OutputFormat};
use gapbf::config::Config;
use gapbf::driver::{AttemptDriver, DriverMode, DriverSettings, RunOutcome, RunReport};
use gapbf::enumerator::PathEnumerator;
use gapbf::grid::GridGraph;
use gapbf::handler::{AttemptHandler, Handler, HandlerKind};
use gapbf::progress::{ProgressState, spawn_reporter};
use gapbf::render::render_pattern;
use patternledger::AttemptLedger;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = match log_file {
        Some(path) => path.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gapbf")
            .join("logs")
            .join("gapbf.log"),
    };
    if let Some(log_dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?}, file: {})", level, log_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(
        cli.log_level.as_deref(),
        config_log_level.as_deref(),
        cli.log_file.as_deref(),
    )
    .context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run { mode, dry_run } => {
            debug!(%mode, dry_run, "main: matched Run command");
            cmd_run(&config, mode, dry_run).await
        }
        Command::Preview { count } => {
            debug!(count, "main: matched Preview command");
            cmd_preview(&config, count)
        }
        Command::Count => {
            debug!("main: matched Count command");
            cmd_count(&config)
        }
        Command::Status { ledger, format } => {
            debug!(?ledger, ?format, "main: matched Status command");
            cmd_status(&config, ledger.as_deref(), format)
        }
    }
}

/// Build the grid and an enumerator for the configured constraints
///
/// Rejects prefixes and suffixes that are not adjacent chains instead of
/// silently enumerating nothing.
fn enumerator(config: &Config) -> Result<PathEnumerator> {
    let graph = Arc::new(config.graph().context("Invalid grid configuration")?);
    let constraints = config.constraints(&graph);
    constraints
        .check_reachable(&graph)
        .context("Invalid path constraints")?;
    PathEnumerator::new(graph, &constraints).context("Invalid path constraints")
}

/// Largest grid whose search space `run` counts up front
const RUN_COUNT_MAX_NODES: usize = 9;

/// Size of the search space: the configured total, or a full count
fn search_space(config: &Config) -> Result<u64> {
    if let Some(total) = config.known_total() {
        debug!(total, "search_space: using configured total");
        return Ok(total);
    }
    let total = enumerator(config)?.count_remaining();
    info!(total, "Counted search space");
    Ok(total)
}

/// Run the brute force session
async fn cmd_run(config: &Config, mode: HandlerKind, dry_run: bool) -> Result<()> {
    debug!(%mode, dry_run, "cmd_run: called");
    let kind = if dry_run { mode.for_dry_run() } else { mode };
    config.validate(Some(kind))?;

    let patterns = enumerator(config)?;
    let graph: Arc<GridGraph> = Arc::clone(patterns.graph());
    let total = if config.known_total().is_some() || graph.node_count() <= RUN_COUNT_MAX_NODES {
        Some(search_space(config)?)
    } else {
        info!("Search space too large to count up front; set total-paths to track percentage");
        None
    };
    let handler = Handler::create(kind, config, &graph).await?;

    let ledger_path = config.ledger_path(mode);
    let (ledger, driver_mode) = if handler.is_observational() {
        let snapshot = AttemptLedger::snapshot(ledger_path)
            .with_context(|| format!("Failed to read ledger {}", ledger_path.display()))?;
        (snapshot, DriverMode::DryRun)
    } else {
        let ledger =
            AttemptLedger::load(ledger_path).with_context(|| format!("Failed to open ledger {}", ledger_path.display()))?;
        (ledger, DriverMode::Live)
    };

    print_banner(config, &graph, kind, total, &ledger, ledger_path);

    if let Some(winning) = ledger.summary().winning {
        info!(key = %winning.key, "Ledger already holds a successful pattern");
        println!(
            "{} Pattern already found: {} (recorded {})",
            "[SUCCESS]".green().bold(),
            winning.key.bold(),
            winning.timestamp
        );
        return Ok(());
    }

    let progress = Arc::new(ProgressState::new(total));
    let reporter = (driver_mode == DriverMode::Live && config.progress.interval_ms > 0)
        .then(|| spawn_reporter(Arc::clone(&progress), Duration::from_millis(config.progress.interval_ms)));

    let mut driver = AttemptDriver::new(handler, ledger, DriverSettings::from_config(config), driver_mode)?
        .with_progress(Arc::clone(&progress));

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let signals = tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => warn!(error = %e, "cmd_run: failed to install signal handlers"),
        }
    });

    let report = driver.run(patterns, shutdown_rx).await;
    signals.abort();
    if let Some(reporter) = reporter {
        reporter.abort();
    }

    let report = report?;
    print_report(&graph, &report);
    match report.outcome {
        RunOutcome::Aborted { reason } => bail!("Run aborted: {}", reason),
        _ => Ok(()),
    }
}

/// Resolve on SIGINT or SIGTERM
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, stopping after the current attempt"),
            _ = sigterm.recv() => info!("SIGTERM received, stopping after the current attempt"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("ctrl_c received, stopping after the current attempt");
    }

    Ok(())
}

fn print_banner(
    config: &Config,
    graph: &GridGraph,
    kind: HandlerKind,
    total: Option<u64>,
    ledger: &AttemptLedger,
    ledger_path: &Path,
) {
    let side = config.grid.size;
    println!("{} Mode {}, grid {}x{}", "[CONFIG]".cyan(), kind, side, side);
    println!(
        "{} Lengths {} to {}, prefix {:?}, suffix {:?}, excluded {:?}",
        "[CONFIG]".cyan(),
        config.path.min_length,
        config.constraints(graph).max_length,
        config.path.prefix,
        config.path.suffix,
        config.path.excluded
    );
    match total {
        Some(total) => println!("{} {} patterns in the search space", "[CONFIG]".cyan(), total),
        None => println!("{} Search space not counted", "[CONFIG]".cyan()),
    }

    let stats = ledger.load_stats();
    println!(
        "{} Ledger {}: {} recorded{}",
        "[CONFIG]".cyan(),
        ledger_path.display(),
        ledger.len(),
        if ledger.is_persistent() { "" } else { " (read only)" }
    );
    if stats.malformed > 0 {
        println!("{} {} malformed ledger lines skipped", "[WARN]".yellow(), stats.malformed);
    }
}

fn print_report(graph: &GridGraph, report: &RunReport) {
    let stats = &report.stats;
    println!();
    match &report.outcome {
        RunOutcome::Succeeded { pattern, detail } => {
            println!("{} Pattern found: {}", "[SUCCESS]".green().bold(), pattern.to_string().bold());
            for line in render_pattern(graph, pattern) {
                println!("    {}", line);
            }
            if let Some(detail) = detail {
                println!("    {}", detail.dimmed());
            }
        }
        RunOutcome::Exhausted => println!("{} No pattern left to try", "[DONE]".yellow()),
        RunOutcome::Interrupted => println!("{} Interrupted; progress saved, rerun to resume", "[STOP]".yellow()),
        RunOutcome::Aborted { reason } => println!("{} {}", "[ABORT]".red().bold(), reason),
    }
    println!(
        "{} attempted, {} skipped, {} unknown, {} retries in {:.1}s",
        stats.attempted,
        stats.skipped,
        stats.unknown,
        stats.retries,
        report.elapsed.as_secs_f64()
    );
}

/// Count patterns and render the first few
fn cmd_preview(config: &Config, count: usize) -> Result<()> {
    debug!(count, "cmd_preview: called");
    config.validate(None)?;
    let total = search_space(config)?;
    let patterns = enumerator(config)?;
    let graph = Arc::clone(patterns.graph());

    println!("{} patterns in the search space", total.to_string().bold());
    for (i, pattern) in patterns.take(count).enumerate() {
        println!();
        println!("{} {}", format!("#{}", i + 1).cyan(), pattern);
        for line in render_pattern(&graph, &pattern) {
            println!("    {}", line);
        }
    }
    Ok(())
}

/// Print the number of patterns
fn cmd_count(config: &Config) -> Result<()> {
    debug!("cmd_count: called");
    config.validate(None)?;
    let total = enumerator(config)?.count_remaining();
    println!("{}", total);
    Ok(())
}

/// Summarise a ledger
fn cmd_status(config: &Config, ledger: Option<&Path>, format: OutputFormat) -> Result<()> {
    debug!(?ledger, ?format, "cmd_status: called");
    let path = ledger.unwrap_or(config.ledger.path.as_path());
    let snapshot =
        AttemptLedger::snapshot(path).with_context(|| format!("Failed to read ledger {}", path.display()))?;
    let summary = snapshot.summary();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "ledger": path,
                "summary": summary,
                "load": snapshot.load_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Ledger: {}", path.display());
            println!(
                "Records: {} ({} failure, {} unknown, {} success)",
                summary.total, summary.failure, summary.unknown, summary.success
            );
            if let Some(last) = &summary.last {
                println!("Last attempt: {} ({}) at {}", last.key, last.outcome, last.timestamp);
            }
            match &summary.winning {
                Some(winning) => println!("{} {}", "Successful pattern:".green().bold(), winning.key.bold()),
                None => println!("No successful pattern recorded"),
            }
            let stats = snapshot.load_stats();
            if stats.malformed > 0 || stats.duplicates > 0 {
                println!(
                    "{} {} malformed and {} duplicate lines skipped",
                    "[WARN]".yellow(),
                    stats.malformed,
                    stats.duplicates
                );
            }
        }
    }
    Ok(())
}
