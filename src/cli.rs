// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes. Two subcommands:
// - crawl: run a full crawl for one configured site
// - sites: list the sites this binary knows how to crawl
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "product-harvester",
    version = "0.1.0",
    about = "Crawl retail sites via their sitemaps and harvest structured product data",
    long_about = "product-harvester discovers product pages through a site's sitemap tree, \
                  extracts structured records per site, downloads linked manuals, and streams \
                  everything into JSON (and optionally CSV) exports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl one configured site end to end
    ///
    /// Example: product-harvester crawl rona --max-items 100 --csv
    Crawl {
        /// Site key to crawl (see the 'sites' subcommand)
        site: String,

        /// Stop after exporting this many records
        #[arg(long)]
        max_items: Option<usize>,

        /// Directory for the JSON/CSV exports and metadata
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory for downloaded manuals (one subdirectory per site)
        #[arg(long, default_value = "manuals")]
        manuals_dir: PathBuf,

        /// Also write a flat CSV export alongside the JSON
        #[arg(long)]
        csv: bool,

        /// Total in-flight request ceiling across the run
        #[arg(long, default_value_t = 8)]
        max_concurrency: usize,

        /// Directory for the response cache
        #[arg(long, default_value = ".httpcache")]
        cache_dir: PathBuf,

        /// Skip the response cache entirely
        #[arg(long)]
        no_cache: bool,

        /// Crawl without consulting robots.txt (not recommended)
        #[arg(long)]
        ignore_robots: bool,
    },

    /// List the configured site profiles
    Sites,
}
