//! Link-Vigil main entry point
//!
//! This is the command-line interface for the Link-Vigil link checker.

use anyhow::{bail, Context};
use clap::Parser;
use link_vigil::cache::open_cache;
use link_vigil::config::{load_config_with_hash, Config};
use link_vigil::Checker;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Link-Vigil: checks that external links are alive
///
/// Each URL is fetched with redirects, meta refreshes and retries handled
/// explicitly, and its fragment is looked up on the final page. One JSON
/// record per URL is printed to stdout.
#[derive(Parser, Debug)]
#[command(name = "link-vigil")]
#[command(version)]
#[command(about = "Checks that external links are alive", long_about = None)]
struct Cli {
    /// URLs to check
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read URLs from a file, one per line ('#' starts a comment)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Do not read or write the result cache
    #[arg(long)]
    no_cache: bool,

    /// Remove expired cache entries before checking
    #[arg(long, conflicts_with = "no_cache")]
    purge_cache: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if cli.no_cache {
        config.cache.enabled = false;
    }

    if cli.purge_cache && config.cache.enabled {
        handle_purge(&config)?;
    }

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        urls.extend(read_url_list(path)?);
    }

    if urls.is_empty() {
        if cli.purge_cache {
            return Ok(ExitCode::SUCCESS);
        }
        bail!("No URLs given; pass them as arguments or with --input");
    }

    let checker = Checker::from_config(&config).context("Failed to set up the checker")?;
    let statuses = checker.check_urls(&urls).await;

    let mut any_dead = false;
    for status in &statuses {
        any_dead |= !status.status.is_alive();
        println!("{}", serde_json::to_string(status)?);
    }

    Ok(if any_dead {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only outcome records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("link_vigil=info,warn"),
            1 => EnvFilter::new("link_vigil=debug,info"),
            2 => EnvFilter::new("link_vigil=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --purge-cache: drops expired and stale entries
fn handle_purge(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.cache.path);
    let cache = open_cache(path, config.cache_ttl())
        .with_context(|| format!("Failed to open cache at {}", path.display()))?;
    let removed = cache.purge_expired()?;
    tracing::info!(
        "Purged {} cache entries, {} remain",
        removed,
        cache.len()?
    );
    Ok(())
}

/// Reads one URL per line, skipping blanks and comments
fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
