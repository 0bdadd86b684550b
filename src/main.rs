// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Initialize tracing (RUST_LOG controls verbosity, stderr only so
//    stdout stays clean)
// 3. Validate the requested site profile - the only fatal path, taken
//    before any crawling begins
// 4. Run the crawl and print a summary
// 5. Exit with proper code (0 = clean, 1 = finished with per-item
//    failures, 2 = fatal error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod classify; // src/classify.rs - product URL classifier
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - site profiles and run settings
mod crawl; // src/crawl/ - scheduler, fetcher, robots, throttle
mod error; // src/error.rs - typed error taxonomy
mod extract; // src/extract/ - per-site extraction strategies
mod pipeline; // src/pipeline/ - validate/dedup/download/export stages
mod records; // src/records.rs - ProductRecord and friends
mod sitemap; // src/sitemap/ - sitemap resolution
mod stats; // src/stats.rs - run counters
mod urls; // src/urls.rs - URL identity and resolution

use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::RunSettings;
use crawl::CrawlOutcome;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("product_harvester=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = crawl completed with no per-item failures
//   Ok(1) = crawl completed but some items failed
//   Err   = fatal error (bad site key, broken configuration)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            site,
            max_items,
            data_dir,
            manuals_dir,
            csv,
            max_concurrency,
            cache_dir,
            no_cache,
            ignore_robots,
        } => {
            let settings = RunSettings {
                max_items,
                max_concurrency,
                data_dir,
                manuals_dir,
                csv_export: csv,
                cache_dir: if no_cache { None } else { Some(cache_dir) },
                obey_robots: !ignore_robots,
                ..RunSettings::default()
            };
            handle_crawl(&site, settings).await
        }
        Commands::Sites => {
            handle_sites();
            Ok(0)
        }
    }
}

// Handles the 'crawl' subcommand: validates the profile, runs the
// crawl, prints the summary.
async fn handle_crawl(site: &str, settings: RunSettings) -> Result<i32> {
    let Some(profile) = config::profile_for(site) else {
        let known: Vec<String> = config::builtin_profiles()
            .into_iter()
            .map(|p| p.key)
            .collect();
        bail!("site '{}' not configured. Available: {}", site, known.join(", "));
    };
    if profile.concurrent_requests == 0 {
        bail!("profile '{}' allows zero concurrent requests", profile.key);
    }
    if url::Url::parse(&profile.base_url).is_err() {
        bail!("profile '{}' has an invalid base URL", profile.key);
    }

    println!("🔍 Crawling {} ({})", profile.name, profile.base_url);
    println!("🗺️  Sitemap entry: {}", profile.sitemap_url);
    if let Some(max) = settings.max_items {
        println!("📏 Item ceiling: {}", max);
    }

    let outcome = crawl::run_crawl(&profile, &settings).await?;
    print_summary(&outcome);

    if outcome.stats.failure_count() > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'sites' subcommand: one line per configured profile.
fn handle_sites() {
    println!("{:<15} {:<15} {:<35} {}", "KEY", "STRATEGY", "BASE URL", "DELAY");
    println!("{}", "=".repeat(75));
    for profile in config::builtin_profiles() {
        println!(
            "{:<15} {:<15} {:<35} {}s",
            profile.key, profile.strategy, profile.base_url, profile.download_delay
        );
    }
}

// Prints the run summary in a human-readable form.
fn print_summary(outcome: &CrawlOutcome) {
    let stats = &outcome.stats;

    println!();
    println!("📊 Crawl summary:");
    println!("   🌐 Pages fetched: {}", stats.pages_fetched);
    println!("   💾 Cache hits: {}", stats.pages_from_cache);
    println!("   ⏭️  Skipped (robots): {}", stats.skipped_robots);
    println!("   ⏭️  Skipped (duplicate URL): {}", stats.skipped_duplicate);
    println!("   ❌ Fetch failures: {}", stats.fetch_failures);
    println!("   ❌ Extraction failures: {}", stats.extraction_failures);
    println!("   🗑️  Records dropped: {}", stats.records_dropped);
    println!("   ✅ Records exported: {}", stats.records_exported);
    println!();
    println!("📄 Export: {}", display(&outcome.export_path));
    println!("📄 Metadata: {}", display(&outcome.metadata_path));
    if let Some(csv_path) = &outcome.csv_path {
        println!("📄 CSV: {}", display(csv_path));
    }
    println!("📁 Manuals: {}", display(&outcome.manuals_dir));
}

fn display(path: &PathBuf) -> String {
    path.display().to_string()
}
