//! Brewcrawl main entry point
//!
//! This is the command-line interface for the Brewcrawl site crawler.

use anyhow::Context;
use brewcrawl::config::{load_config_with_hash, validate, CrawlConfig};
use brewcrawl::output::{
    print_discovery_summary, print_statistics, save_crawl_result, save_discovery,
    CrawlStatistics,
};
use brewcrawl::{crawl, discover_links};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Brewcrawl: a single-site crawler with JavaScript-rendering fallback
///
/// Brewcrawl walks one website breadth-first, extracts links with eleven
/// strategies, renders JavaScript-dependent pages in headless Chromium and
/// merges the structured data found on every page.
#[derive(Parser, Debug)]
#[command(name = "brewcrawl")]
#[command(version)]
#[command(about = "A single-site crawler with JavaScript-rendering fallback", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "START_URL")]
    start_url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Named preset to use instead of a config file
    #[arg(long, value_parser = ["default", "aggressive", "conservative", "coffee"])]
    preset: Option<String>,

    /// Only collect links and write the discovery artifact
    #[arg(long)]
    discover_only: bool,

    /// Where to write the JSON result
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&cli.start_url, &config, config_hash.as_deref());
    } else if cli.discover_only {
        handle_discover(&cli, config, config_hash).await?;
    } else {
        handle_crawl(&cli, config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("brewcrawl=info,warn"),
            1 => EnvFilter::new("brewcrawl=debug,info"),
            2 => EnvFilter::new("brewcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks the config file, the named preset or the defaults, in that order
fn resolve_config(cli: &Cli) -> anyhow::Result<(CrawlConfig, Option<String>)> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
        let (config, hash) = load_config_with_hash(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
        return Ok((config, Some(hash)));
    }

    let name = cli.preset.as_deref().unwrap_or("default");
    let config = CrawlConfig::from_preset(name)?;
    validate(&config)?;
    tracing::info!("Using {} preset", name);
    Ok((config, None))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(start_url: &str, config: &CrawlConfig, config_hash: Option<&str>) {
    println!("=== Brewcrawl Dry Run ===\n");
    println!("Start URL: {}", start_url);
    if let Some(hash) = config_hash {
        println!("Config hash: {}", hash);
    }

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Normalize URLs: {}", config.crawler.normalize_urls);

    println!("\nFilters:");
    println!(
        "  Follow external links: {}",
        config.filters.follow_external_links
    );
    let blocked: Vec<&str> = config
        .filters
        .blocked_extensions
        .iter()
        .map(String::as_str)
        .collect();
    println!("  Blocked extensions: {}", blocked.join(", "));

    println!("\nRendering:");
    println!(
        "  Dynamic rendering: {}",
        config.rendering.enable_dynamic_rendering
    );
    println!("  Render timeout: {}ms", config.rendering.render_timeout_ms);
    println!(
        "  JS score threshold: {} (strict mode: {})",
        config.js_detection.min_score, config.js_detection.strict_mode
    );

    println!("\n✓ Configuration is valid");
}

/// Handles --discover-only: collects links and writes the discovery artifact
async fn handle_discover(
    cli: &Cli,
    config: CrawlConfig,
    config_hash: Option<String>,
) -> anyhow::Result<()> {
    tracing::info!("Discovering links from {}", cli.start_url);
    let mut discovery = discover_links(&cli.start_url, config).await?;
    if let Some(hash) = config_hash {
        discovery = discovery.with_config_hash(hash);
    }

    print_discovery_summary(&discovery);

    if let Some(path) = &cli.output {
        save_discovery(&discovery, path)?;
        println!("\n✓ Discovery written to: {}", path.display());
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: CrawlConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} (max {} pages, {} workers)",
        cli.start_url,
        config.crawler.max_pages,
        config.crawler.max_workers
    );

    let result = crawl(&cli.start_url, config).await?;
    if result.is_empty() {
        tracing::warn!("No pages were crawled from {}", cli.start_url);
    }

    print_statistics(&CrawlStatistics::from_result(&result));

    if let Some(path) = &cli.output {
        save_crawl_result(&result, path)?;
        println!("\n✓ Results written to: {}", path.display());
    }
    Ok(())
}
