//! CLI entry point for wordfleet.
//!
//! This binary runs either side of the distributed word count: the
//! scanning agent, which finds recently modified files and sends their
//! paths, or the counting service, which tallies words until interrupted.
//!
//! # Usage
//!
//! ```bash
//! wordfleet [OPTIONS] <COMMAND>
//!
//! # Start the counting service with 4 mappers
//! wordfleet serve 4
//!
//! # Send every file modified after the cutoff to the service
//! wordfleet scan 1700000000 --root ./directory_big
//!
//! # Count locally instead of dispatching
//! wordfleet scan 1700000000 --local
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wf_core::{Config, ScanConfig, ServiceConfig, WordCount};
use wf_scanner::{Cutoff, DispatchReport, ScanAgent, ScanResult};
use wf_service::{ReportFormat, Service};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Distributed word count over recently modified files.
///
/// Run `serve` on the counting host and `scan` wherever the files live.
#[derive(Parser)]
#[command(name = "wordfleet", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Command-line flags override its values.
    #[arg(short, long, global = true, env = "WORDFLEET_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan for files modified after a cutoff and send them for counting.
    Scan(ScanArgs),

    /// Run the counting service until interrupted, then print the totals.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Cutoff in seconds since the Unix epoch. Only entries modified
    /// strictly after it are reported.
    #[arg(allow_negative_numbers = true)]
    cutoff: i64,

    /// Directory to scan.
    #[arg(short, long, env = "WORDFLEET_ROOT")]
    root: Option<Utf8PathBuf>,

    /// Address of the counting service.
    #[arg(short, long, env = "WORDFLEET_SERVER")]
    server: Option<SocketAddr>,

    /// Number of scan (and local counting) threads.
    #[arg(short, long, env = "WORDFLEET_WORKERS")]
    workers: Option<usize>,

    /// Count the files locally instead of sending them to the service.
    #[arg(long)]
    local: bool,

    /// Maximum number of per-file results kept by the result cache.
    #[arg(long, env = "WORDFLEET_CACHE_CAPACITY")]
    cache_capacity: Option<usize>,
}

#[derive(Args)]
struct ServeArgs {
    /// Number of mapper workers, each counting one batch at a time.
    workers: Option<usize>,

    /// Address to listen on.
    #[arg(short, long, env = "WORDFLEET_BIND")]
    bind: Option<SocketAddr>,

    /// Threads shared by all mappers for counting files within a batch.
    #[arg(long, env = "WORDFLEET_INNER_PARALLELISM")]
    inner_parallelism: Option<usize>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only report the N most frequent words.
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Output file for the report (defaults to stdout).
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,
}

/// Report output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// `word: count` lines.
    Text,
    /// JSON object with statistics and words.
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so that reports on stdout stay machine-readable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, if any, or the defaults.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    match &cli.config {
        Some(path) => {
            Config::from_json_file(path).wrap_err_with(|| format!("Failed to load {path}"))
        }
        None => Ok(Config::default()),
    }
}

/// Applies `scan` flags on top of `config` and validates the result.
fn build_scan_config(mut config: Config, args: &ScanArgs) -> color_eyre::Result<ScanConfig> {
    if let Some(root) = &args.root {
        config.scan.root.clone_from(root);
    }
    if let Some(server) = args.server {
        config.scan.server_addr = server;
    }
    if args.workers.is_some() {
        config.scan.workers = args.workers;
    }
    if let Some(capacity) = args.cache_capacity {
        config.scan.cache_capacity = capacity;
    }
    config.validate()?;
    Ok(config.scan)
}

/// Applies `serve` flags on top of `config` and validates the result.
fn build_service_config(mut config: Config, args: &ServeArgs) -> color_eyre::Result<ServiceConfig> {
    if let Some(workers) = args.workers {
        config.service.mapper_workers = workers;
    }
    if let Some(bind) = args.bind {
        config.service.bind_addr = bind;
    }
    if args.inner_parallelism.is_some() {
        config.service.inner_parallelism = args.inner_parallelism;
    }
    config.validate()?;
    Ok(config.service)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Scans for modified files, then dispatches or counts them.
///
/// # Errors
///
/// Returns an error if the root is invalid, a worker fails, or the counting
/// service cannot be reached.
async fn run_scan(config: ScanConfig, cutoff: i64, local: bool) -> color_eyre::Result<()> {
    let agent = ScanAgent::new(config, Cutoff::from_unix_secs(cutoff))
        .wrap_err("Failed to create scan agent")?;

    let scanner = agent.clone();
    let result = tokio::task::spawn_blocking(move || scanner.scan())
        .await?
        .wrap_err("Scan failed")?;

    if local {
        let files = result.files.clone();
        let counter = agent.clone();
        let counted = tokio::task::spawn_blocking(move || counter.count_locally(&files))
            .await??;
        info!(
            files = counted.files,
            failed = counted.failed,
            cache_hits = counted.cache_hits,
            cache_entries = agent.cache().len(),
            "Counted locally"
        );
        print_word_counts(&counted.counts)?;
    } else {
        let report = agent
            .dispatch(&result.files)
            .await
            .wrap_err("Failed to dispatch batch")?;
        print_scan_summary(&result, &report)?;
    }

    Ok(())
}

/// Runs the counting service until Ctrl-C or SIGTERM, then writes the report.
///
/// # Errors
///
/// Returns an error if the service cannot start or shut down cleanly, or
/// the report cannot be written.
async fn run_serve(
    config: ServiceConfig,
    format: OutputFormat,
    top: Option<usize>,
    output: Option<Utf8PathBuf>,
) -> color_eyre::Result<()> {
    let running = Service::start(config)
        .await
        .wrap_err("Failed to start counting service")?;

    wait_for_shutdown_signal().await?;
    let report = running.shutdown().await?;

    if let Some(output_path) = output {
        let file = File::create(output_path.as_std_path())
            .wrap_err_with(|| format!("Failed to create {output_path}"))?;
        let mut writer = BufWriter::new(file);
        report.write_to(&mut writer, format.into(), top)?;
        info!(path = %output_path, "Report written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        report.write_to(&mut handle, format.into(), top)?;
    }

    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
async fn wait_for_shutdown_signal() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of the scan and dispatch.
fn print_scan_summary(result: &ScanResult, report: &DispatchReport) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let stats = &result.stats;

    writeln!(handle, "Scan Summary")?;
    writeln!(handle, "============")?;
    writeln!(handle, "Files matched:        {}", stats.files_matched)?;
    writeln!(handle, "Files too old:        {}", stats.files_skipped)?;
    writeln!(handle, "Directories scanned:  {}", stats.dirs_expanded)?;
    writeln!(handle, "Directories pruned:   {}", stats.dirs_pruned)?;
    writeln!(handle, "Unreadable:           {}", stats.dir_errors + stats.entries_unreadable)?;
    writeln!(
        handle,
        "Traversal time:       {:.3}s",
        result.elapsed.as_secs_f64()
    )?;

    writeln!(handle)?;
    writeln!(handle, "Paths sent:           {}", report.paths)?;
    if report.skipped > 0 {
        writeln!(handle, "Paths not sendable:   {}", report.skipped)?;
    }
    writeln!(handle, "Bytes sent:           {}", report.bytes)?;
    writeln!(
        handle,
        "Dispatch time:        {:.3}s",
        report.elapsed.as_secs_f64()
    )?;

    Ok(())
}

/// Prints `word: count` lines in lexicographic order.
fn print_word_counts(counts: &WordCount) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for (word, count) in counts.sorted() {
        writeln!(handle, "{word}: {count}")?;
    }
    handle.flush()?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration
    let config = load_config(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Scan(args) => {
            let scan = build_scan_config(config, args)?;
            run_scan(scan, args.cutoff, args.local).await
        }
        Commands::Serve(args) => {
            let service = build_service_config(config, args)?;
            run_serve(service, args.format, args.top, args.output.clone()).await
        }
    }
}
