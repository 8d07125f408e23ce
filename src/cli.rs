//! CLI commands implementation.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use robustfetch::{FetchResult, Fetcher, FetcherConfig};

#[derive(Parser)]
#[command(name = "robustfetch")]
#[command(about = "Adaptive, policy-aware HTTP fetch engine")]
#[command(version)]
struct Cli {
    /// URLs to fetch, in order
    #[arg(required = true)]
    urls: Vec<String>,

    /// JSON config file (FetcherConfig fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum inter-request delay in seconds
    #[arg(long)]
    min_delay: Option<f64>,

    /// Maximum inter-request delay in seconds
    #[arg(long)]
    max_delay: Option<f64>,

    /// Retries after the initial attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip robots.txt checks
    #[arg(long)]
    ignore_robots: bool,

    /// Proxy endpoint URL (repeatable)
    #[arg(long = "proxy")]
    proxies: Vec<String>,

    /// Include mobile browser identities in the rotation pool
    #[arg(long)]
    mobile: bool,

    /// Write fetch results (metadata, not bodies) to a JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    // Consumed by is_verbose() before parsing, for early logging setup
    #[arg(short, long)]
    #[allow(dead_code)]
    verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str::<FetcherConfig>(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => FetcherConfig::default(),
    };

    if let Some(min) = cli.min_delay {
        config.min_delay_secs = min;
    }
    if let Some(max) = cli.max_delay {
        config.max_delay_secs = max;
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.ignore_robots {
        config.respect_policy = false;
    }
    if !cli.proxies.is_empty() {
        config.proxies = cli.proxies.clone();
    }
    if cli.mobile {
        config.include_mobile_identities = true;
    }

    let fetcher = Fetcher::new(config)?;

    let bar = if cli.urls.len() > 1 {
        let bar = ProgressBar::new(cli.urls.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid progress template"),
        );
        Some(bar)
    } else {
        None
    };

    let results = fetcher
        .fetch_many(&cli.urls, |result| {
            if let Some(bar) = &bar {
                bar.set_message(summarize(result));
                bar.inc(1);
            }
        })
        .await;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    for result in &results {
        println!("{}", summarize(result));
    }

    let stats = fetcher.stats();
    println!();
    println!("requests: {}", stats.requests);
    println!("success:  {}", stats.success);
    println!("failed:   {}", stats.failed);
    println!("retried:  {}", stats.retried);
    println!("blocked:  {}", stats.blocked);
    println!("success rate: {:.1}%", stats.success_rate() * 100.0);

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing results to {}", path.display()))?;
        info!("Exported {} results to {}", results.len(), path.display());
    }

    Ok(())
}

fn summarize(result: &FetchResult) -> String {
    match result.status {
        Some(_) if result.is_success() => {
            format!(
                "OK   {} ({} bytes, {}ms)",
                result.url,
                result.body.len(),
                result.elapsed_ms
            )
        }
        Some(status) => format!(
            "FAIL {} (HTTP {}: {})",
            result.url,
            status,
            result.error.as_deref().unwrap_or("error")
        ),
        None => format!(
            "FAIL {} ({})",
            result.url,
            result.error.as_deref().unwrap_or("error")
        ),
    }
}
