//! Tidecrawl main entry point
//!
//! Command-line front end for the crawl orchestration library. The browser
//! automation backend is an external collaborator, so this binary focuses
//! on configuration validation and crawl planning; an actual run embeds
//! the library together with a `BrowserPage`/`BrowserContext` backend.

use clap::Parser;
use std::path::PathBuf;
use tidecrawl::config::{load_config_with_hash, Config, CrawlMode, LoginType};
use tracing_subscriber::EnvFilter;

/// Tidecrawl: crawl orchestration for browser-backed platforms
#[derive(Parser, Debug)]
#[command(name = "tidecrawl")]
#[command(version = "1.0.0")]
#[command(about = "Crawl orchestration for browser-backed platforms", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the crawl plan without crawling
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    // Crawling needs a browser automation backend, which this binary does
    // not bundle. Dispatcher wiring happens in the embedding application.
    tracing::error!(
        "No browser automation backend is bundled with this binary; \
         run with --dry-run to validate the configuration, or embed \
         tidecrawl as a library and wire a backend into the Dispatcher"
    );
    Err("no browser automation backend available".into())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidecrawl=info,warn"),
            1 => EnvFilter::new("tidecrawl=debug,info"),
            2 => EnvFilter::new("tidecrawl=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config, config_hash: &str) {
    println!("=== Tidecrawl Dry Run ===\n");

    println!("Platform:");
    println!("  Entry URL: {}", config.platform.entry_url);
    println!("  Cookie domain: {}", config.platform.cookie_domain);
    println!("  Block marker: {}", config.platform.block_marker);

    println!("\nLogin:");
    match config.login.login_type {
        LoginType::Qrcode => println!("  Type: qrcode (interactive confirmation)"),
        LoginType::Cookie => println!("  Type: cookie (pre-captured session)"),
    }
    println!("  Auth cookie: {}", config.login.auth_cookie_name);

    println!("\nCrawl:");
    println!("  Max concurrency: {}", config.crawl.max_concurrency);
    println!("  Comments enabled: {}", config.crawl.enable_comments);
    println!("  Media download enabled: {}", config.crawl.enable_media);
    match config.crawl.mode {
        CrawlMode::Search => {
            let keywords = config.crawl.keyword_list();
            println!("  Mode: search ({} keywords)", keywords.len());
            for keyword in &keywords {
                println!(
                    "    - {} (up to {} items)",
                    keyword, config.crawl.max_items_per_keyword
                );
            }
        }
        CrawlMode::Detail => {
            println!("  Mode: detail ({} items)", config.crawl.item_ids.len());
            for id in &config.crawl.item_ids {
                println!("    - {}", id);
            }
        }
        CrawlMode::Creator => {
            println!(
                "  Mode: creator ({} references)",
                config.crawl.creator_refs.len()
            );
            for creator_ref in &config.crawl.creator_refs {
                println!("    - {}", creator_ref);
            }
        }
    }

    println!("\nProxy: {}", if config.proxy.enabled { "enabled" } else { "direct" });
    println!("Cache sweep interval: {}s", config.cache.cron_interval_seconds);

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
