//! Mockwire CLI
//!
//! Usage:
//!   mockwire serve [--config FILE] [--port N] [--host H] [--mocks DIR] [--timeout S]
//!                  [--export FILE]
//!   mockwire check --mocks DIR
//!   mockwire replay --url URL --mocks DIR

use anyhow::Context;
use clap::{Parser, Subcommand};
use mockwire::{
    ActivityLog, Config, DispatchSettings, FanoutSink, MatchConfig, MatchRepository, MockLibrary,
    MockServer, Replayer, RequestDispatcher, TracingSink,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Mockwire - replay recorded HTTP/SOAP traffic
#[derive(Parser, Debug)]
#[command(name = "mockwire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve mocks over HTTP
    Serve {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<IpAddr>,
        /// Mock directory
        #[arg(short, long)]
        mocks: Option<PathBuf>,
        /// Service timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// On shutdown, write served requests with no loaded mock to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Load mock files and report problems
    Check {
        #[arg(short, long)]
        mocks: PathBuf,
    },
    /// Send every mock's request to a running server
    Replay {
        /// Base URL of the server
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        url: String,
        #[arg(short, long)]
        mocks: PathBuf,
        /// Request timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Command::Serve {
            config,
            port,
            host,
            mocks,
            timeout,
            export,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(port) = port {
                config.listen.port = port;
            }
            if let Some(host) = host {
                config.listen.host = host;
            }
            if let Some(mocks) = mocks {
                config.mocks.directory = mocks;
            }
            if let Some(timeout) = timeout {
                config.service_timeout_secs = timeout;
            }
            config.validate()?;
            serve(config, export.as_deref()).await
        }
        Command::Check { mocks } => check(&mocks),
        Command::Replay {
            url,
            mocks,
            timeout,
        } => replay(&url, &mocks, Duration::from_secs(timeout)).await,
    }
}

async fn serve(config: Config, export: Option<&Path>) -> anyhow::Result<()> {
    let match_config = config.matching.load()?;
    let repository = Arc::new(MatchRepository::new(match_config));
    let library = MockLibrary::new(Arc::clone(&repository));
    let report = library.load_directory(&config.mocks.directory)?;
    for (path, e) in &report.failed {
        warn!("Mock file {} not loaded: {}", path.display(), e);
    }

    let activity = Arc::new(ActivityLog::new(config.activity.capacity));
    let sink = FanoutSink::default()
        .with(Arc::new(TracingSink))
        .with(activity.clone());
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::clone(&repository),
        Arc::new(sink),
        DispatchSettings::from_config(&config)?,
    ));

    let server = MockServer::bind(config.socket_addr(), dispatcher).await?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let accept_loop = tokio::spawn(server.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping");
    let _ = shutdown_tx.send(());
    accept_loop.await?;

    if let Some(path) = export {
        let count = activity
            .save_new_mocks(&repository, path)
            .with_context(|| format!("Failed to export mocks to {}", path.display()))?;
        println!("{BOLD}{count}{RESET} new mock(s) exported to {}", path.display());
    }
    Ok(())
}

fn check(dir: &Path) -> anyhow::Result<()> {
    let repository = Arc::new(MatchRepository::new(MatchConfig::default()));
    let library = MockLibrary::new(Arc::clone(&repository));
    let report = library.load_directory(dir)?;

    println!("{BOLD}{CYAN}Mockwire check{RESET} {DIM}{}{RESET}", dir.display());
    for path in &report.loaded {
        println!("  {GREEN}ok{RESET}    {}", path.display());
    }
    for (path, e) in &report.failed {
        println!("  {RED}error{RESET} {}: {}", path.display(), e);
    }

    let stats = repository.stats();
    println!(
        "\n{BOLD}{}{RESET} mocks, {} static paths, {} wildcard paths",
        stats.mocks, stats.static_paths, stats.dynamic_paths
    );

    if !report.is_success() {
        anyhow::bail!("{} mock file(s) failed to load", report.failed.len());
    }
    Ok(())
}

async fn replay(url: &str, dir: &Path, timeout: Duration) -> anyhow::Result<()> {
    let library = MockLibrary::new(Arc::new(MatchRepository::new(MatchConfig::default())));
    library.load_directory(dir)?;
    let files = library.files();
    let replayer = Replayer::new(url, timeout)?;
    let outcomes = replayer.replay(&files).await;

    let mocks = files.iter().flat_map(|f| f.nodes());
    let mut failures = 0;
    for (outcome, mock) in outcomes.iter().zip(mocks) {
        let matched = outcome.matches(mock);
        if !matched {
            failures += 1;
        }
        let marker = if matched {
            format!("{GREEN}ok{RESET}  ")
        } else {
            format!("{RED}FAIL{RESET}")
        };
        let result = match &outcome.result {
            Ok((status, _)) => status.to_string(),
            Err(e) => e.to_string(),
        };
        println!(
            "{marker} {} {} {DIM}->{RESET} {}",
            outcome.method, outcome.url, result
        );
    }

    println!("\n{} replayed, {} failed", outcomes.len(), failures);
    if failures > 0 {
        anyhow::bail!("{failures} mock(s) did not replay as recorded");
    }
    Ok(())
}
