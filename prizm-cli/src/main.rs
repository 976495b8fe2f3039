//! PRIZM CLI
//!
//! Command-line interface for the PRIZM postal-code lookup service:
//! run the API server, look codes up directly, process batch files, and
//! administer the cache.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prizm_api::{ApiConfig, ApiServer, LookupResponse};
use prizm_cache::SegmentCache;
use prizm_core::{normalize_key, LookupStatus, Origin, PostalCode};
use prizm_lookup::LookupService;
use prizm_scraper::{PrizmScraper, ScraperConfig};

/// PRIZM - cached segment lookup for Canadian postal codes
#[derive(Parser)]
#[command(name = "prizm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Look up one or more postal codes
    Lookup {
        /// Postal codes to look up
        #[arg(required = true)]
        codes: Vec<String>,
        /// Print full records as JSON instead of segment numbers
        #[arg(long)]
        json: bool,
    },

    /// Process a file of postal codes
    Batch {
        /// CSV file with one postal code per line
        #[arg(short, long)]
        file: PathBuf,
        /// Output CSV file path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Delay (seconds) between site fetches
        #[arg(short, long, default_value = "2")]
        delay: u64,
    },

    /// Manage the lookup cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache statistics
    Stats,
    /// Remove expired cache entries
    Sweep,
    /// Remove ALL cache entries
    Clear {
        /// Confirm that you want to clear all cache entries
        #[arg(long)]
        confirm: bool,
    },
    /// Check whether a postal code is cached
    Check {
        /// Postal code to check
        postal_code: String,
    },
    /// Print the cached payload for a postal code
    Get {
        /// Postal code to retrieve
        postal_code: String,
    },
    /// Delete the cache entry for a postal code
    Delete {
        /// Postal code to delete
        postal_code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "prizm=debug,info"
    } else {
        "prizm=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Lookup { codes, json } => cmd_lookup(&codes, json).await,
        Commands::Batch {
            file,
            output,
            delay,
        } => cmd_batch(&file, output.as_deref(), delay).await,
        Commands::Cache { command } => cmd_cache(command).await,
    }
}

/// Opens the cache and acquires the browser session the service needs.
async fn build_service() -> Result<(LookupService, Arc<PrizmScraper>)> {
    let api_config = ApiConfig::from_env();
    let cache = Arc::new(
        SegmentCache::open(&api_config.cache_path).context("Failed to open cache database")?,
    );

    println!("{}", "Connecting to WebDriver...".cyan());
    let scraper = Arc::new(
        PrizmScraper::connect(ScraperConfig::from_env())
            .await
            .context("Failed to establish WebDriver session")?,
    );

    Ok((LookupService::new(cache, scraper.clone()), scraper))
}

fn open_cache() -> Result<SegmentCache> {
    let api_config = ApiConfig::from_env();
    SegmentCache::open(&api_config.cache_path).context("Failed to open cache database")
}

/// The key an arbitrary raw input is cached under: canonical form when it
/// validates, normalized raw string otherwise.
fn cache_key(raw: &str) -> String {
    PostalCode::parse(raw)
        .map(PostalCode::into_string)
        .unwrap_or_else(|_| normalize_key(raw))
}

/// Run the API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    let (service, scraper) = build_service().await?;
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .context("Invalid bind address")?;

    println!("{} http://{}", "Serving on".green().bold(), addr);

    let server = ApiServer::new(service, ApiConfig::from_env());
    let result = server.run(addr).await;

    scraper.close().await;
    result.context("Server error")
}

/// Look up postal codes directly
async fn cmd_lookup(codes: &[String], json: bool) -> Result<()> {
    let (service, scraper) = build_service().await?;

    for code in codes {
        let result = service.lookup(code).await;

        if json {
            let envelope = LookupResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        } else {
            match result.status {
                LookupStatus::Success => {
                    let segment = result.payload.segment_number().unwrap_or_default();
                    println!("{}", segment.green().bold());
                }
                status => {
                    let status = status.to_string();
                    println!("{}: {}", result.key, status.as_str().red());
                }
            }
        }
    }

    scraper.close().await;
    Ok(())
}

/// Process a batch file of postal codes
async fn cmd_batch(file: &Path, output: Option<&Path>, delay: u64) -> Result<()> {
    let codes = read_codes(file)?;
    if codes.is_empty() {
        bail!("no postal codes found in {}", file.display());
    }

    let (service, scraper) = build_service().await?;

    let bar = ProgressBar::new(codes.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(codes.len());
    for (i, code) in codes.iter().enumerate() {
        bar.set_message(code.clone());
        let result = service.lookup(code).await;
        bar.inc(1);

        let hit_the_site =
            result.origin == Origin::Fresh && result.status != LookupStatus::InvalidFormat;
        results.push(result);

        // Pause between site fetches only; cache hits cost nothing
        if hit_the_site && delay > 0 && i + 1 < codes.len() {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }
    bar.finish_and_clear();
    scraper.close().await;

    let successful = results
        .iter()
        .filter(|r| r.status == LookupStatus::Success)
        .count();
    let failed = results.len() - successful;
    let (ok_count, failed_count) = (successful.to_string(), failed.to_string());

    println!(
        "{} {} codes: {} successful, {} failed",
        "Processed".bold(),
        results.len(),
        ok_count.as_str().green(),
        failed_count.as_str().red(),
    );

    for result in &results {
        match result.status {
            LookupStatus::Success => println!(
                "  {}  {}",
                result.key,
                result.payload.segment_number().unwrap_or_default().green()
            ),
            status => {
                let status = status.to_string();
                println!("  {}  {}", result.key, status.as_str().red());
            }
        }
    }

    if let Some(path) = output {
        write_results_csv(path, &results)?;
        println!("{} {}", "Results saved to".green(), path.display());
    }

    Ok(())
}

fn read_codes(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(field) = record.get(0) {
            let field = field.trim();
            if !field.is_empty() {
                codes.push(field.to_string());
            }
        }
    }
    Ok(codes)
}

fn write_results_csv(path: &Path, results: &[prizm_core::LookupResult]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to write {}", path.display()))?;

    writer.write_record(["postal_code", "segment_number", "status"])?;
    for result in results {
        let status = result.status.to_string();
        writer.write_record([
            result.key.as_str(),
            result.payload.segment_number().unwrap_or(""),
            status.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Cache administration
async fn cmd_cache(command: CacheCommands) -> Result<()> {
    let cache = open_cache()?;

    match command {
        CacheCommands::Stats => {
            let stats = cache.stats();
            println!("{}", "Cache Statistics:".cyan().bold());
            println!("  Total entries: {}", stats.total);
            println!("  Valid entries: {}", stats.valid);
            println!("  Expired entries: {}", stats.expired);
            println!("  Database size: {} bytes", stats.db_size_bytes);
            println!(
                "  Oldest entry: {}",
                stats
                    .oldest_valid
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "N/A".into())
            );
            println!(
                "  Newest entry: {}",
                stats
                    .newest_valid
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "N/A".into())
            );
        }

        CacheCommands::Sweep => {
            let removed = cache.sweep_expired();
            println!("Cleaned up {} expired cache entries", removed);
        }

        CacheCommands::Clear { confirm } => {
            if !confirm {
                eprintln!("{}", "Warning: this will clear ALL cache entries!".yellow());
                bail!("use --confirm to proceed");
            }
            if cache.clear() {
                println!("{}", "All cache entries cleared".green());
            } else {
                bail!("failed to clear cache entries");
            }
        }

        CacheCommands::Check { postal_code } => {
            let key = cache_key(&postal_code);
            match cache.get(&key) {
                Some(entry) => {
                    println!("Postal code {} is cached", key.as_str().green());
                    println!("  Status: {}", entry.payload.status);
                    println!("  Cached at: {}", entry.cached_at);
                    println!("  Expires at: {}", entry.expires_at);
                }
                None => println!("Postal code {} is not cached", key.as_str().yellow()),
            }
        }

        CacheCommands::Get { postal_code } => {
            let key = cache_key(&postal_code);
            match cache.get(&key) {
                Some(entry) => {
                    println!("Cached data for {}:", key.as_str().green());
                    println!("{}", serde_json::to_string_pretty(&entry.payload)?);
                }
                None => bail!("no cached data found for {key}"),
            }
        }

        CacheCommands::Delete { postal_code } => {
            let key = cache_key(&postal_code);
            if cache.delete(&key) {
                println!("Deleted cache entry for {}", key.as_str().green());
            } else {
                println!("No cache entry found for {}", key.as_str().yellow());
            }
        }
    }

    Ok(())
}
