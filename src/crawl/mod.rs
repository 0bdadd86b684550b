// src/crawl/mod.rs
// =============================================================================
// The crawl run: sitemap discovery through pipeline teardown.
//
// How it works:
// 1. Build the run's resources: fetcher (with response cache), robots
//    policy, adaptive throttle, seen-URL registry, pipeline stages
// 2. Discover page URLs through the sitemap tree and classify them down
//    to product candidates on the site's allowed domains
// 3. Fan the candidate URLs out over bounded concurrent workers; each
//    worker dedups, honors robots and the politeness delay, fetches,
//    extracts, and runs its record through the pipeline
// 4. Drain and finalize: the export writer and download log always
//    close, however the run ended
//
// Shared mutable state is exactly the seen-URL set (atomic insert), the
// throttle, and the run counters. A record never waits on another.
//
// Submodules:
// - fetcher: typed HTTP fetch with retries and the response cache
// - robots: robots.txt policy
// - throttle: adaptive politeness delay
// =============================================================================

pub mod fetcher;
pub mod robots;
pub mod throttle;

use crate::classify::filter_product_urls;
use crate::config::{RunSettings, SiteProfile, TARGET_CATEGORIES};
use crate::extract::extract_product;
use crate::pipeline::{
    CsvExportStage, DedupStage, DownloadStage, ItemPipeline, JsonExportStage, Stage,
    ValidationStage,
};
use crate::sitemap;
use crate::stats::{CrawlStats, StatsSnapshot};
use crate::urls::CrawlUrl;
use anyhow::{Context, Result};
use dashmap::DashSet;
use fetcher::{PageFetcher, ResponseCache};
use futures::stream::{self, StreamExt};
use robots::{fetch_robots, RobotsPolicy};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use throttle::AutoThrottle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub stats: StatsSnapshot,
    pub export_path: PathBuf,
    pub metadata_path: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub manuals_dir: PathBuf,
}

/// Runs one site's crawl end to end. Per-item failures are logged and
/// counted, never propagated; an Err from here means the run could not
/// be set up or torn down at all.
pub async fn run_crawl(profile: &SiteProfile, settings: &RunSettings) -> Result<CrawlOutcome> {
    let cache = match &settings.cache_dir {
        Some(dir) => Some(
            ResponseCache::new(dir.join(&profile.key), settings.cache_ttl)
                .context("creating response cache")?,
        ),
        None => None,
    };
    let page_fetcher = PageFetcher::new(
        &profile.user_agent,
        settings.fetch_timeout,
        settings.retry_limit,
        cache,
    )
    .context("building HTTP client")?;

    let robots_policy = if settings.obey_robots {
        Some(fetch_robots(page_fetcher.client(), &profile.base_url).await)
    } else {
        None
    };

    // A robots Crawl-delay larger than the profile's base delay wins
    let base_delay = robots_policy
        .as_ref()
        .and_then(|r| r.crawl_delay(&profile.user_agent))
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
        .max(profile.download_delay);
    let throttle = AutoThrottle::new(
        base_delay,
        settings.max_delay,
        settings.target_concurrency,
        settings.jitter,
    );

    info!(site = %profile.key, sitemap = %profile.sitemap_url, "discovering URLs");
    let discovered = sitemap::discover(
        &page_fetcher,
        &profile.sitemap_url,
        settings.sitemap_depth_limit,
    )
    .await;

    let crawl_urls = classify_candidates(&discovered, profile);
    info!(
        discovered = discovered.len(),
        candidates = crawl_urls.len(),
        "URLs classified"
    );

    // Pipeline stages in their fixed order; the download stage gets its
    // own client with its own timeout, independent of page fetches
    let download_client = reqwest::Client::builder()
        .user_agent(&profile.user_agent)
        .timeout(settings.download_timeout)
        .build()
        .context("building download client")?;

    let export_stage = JsonExportStage::new(&settings.data_dir, &profile.key)?;
    let export_path = export_stage.export_path().to_path_buf();
    let metadata_path = export_stage.metadata_path().to_path_buf();

    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(ValidationStage),
        Box::new(DedupStage::new()),
        Box::new(DownloadStage::new(
            download_client,
            &settings.manuals_dir,
            &profile.key,
        )?),
        Box::new(export_stage),
    ];
    let csv_path = if settings.csv_export {
        let csv_stage = CsvExportStage::new(&settings.data_dir, &profile.key)?;
        let path = csv_stage.path().to_path_buf();
        stages.push(Box::new(csv_stage));
        Some(path)
    } else {
        None
    };
    let pipeline = ItemPipeline::new(stages);

    let stats = CrawlStats::default();
    let seen: DashSet<String> = DashSet::new();
    let stop = AtomicBool::new(false);
    let site_limit = Semaphore::new(profile.concurrent_requests.max(1));

    let processed = stream::iter(crawl_urls.into_iter().map(|cu| {
        process_url(
            cu,
            profile,
            settings,
            &page_fetcher,
            robots_policy.as_ref(),
            &throttle,
            &site_limit,
            &seen,
            &stop,
            &pipeline,
            &stats,
        )
    }))
    .buffer_unordered(settings.max_concurrency.max(1))
    .count()
    .await;

    // Teardown always runs: the export must close into a valid array
    // and the download log must land, even after a stop or a failure
    pipeline
        .close()
        .await
        .context("finalizing pipeline output")?;

    let snapshot = stats.snapshot();
    info!(
        processed,
        exported = snapshot.records_exported,
        "crawl finished"
    );

    Ok(CrawlOutcome {
        stats: snapshot,
        export_path,
        metadata_path,
        csv_path,
        manuals_dir: settings.manuals_dir.join(&profile.key),
    })
}

/// Classifies discovered URLs down to in-scope product candidates.
/// Besides the category filter, this enforces the allow-list invariant:
/// a CrawlUrl never leaves here pointing outside the profile's domains.
fn classify_candidates(discovered: &[(String, usize)], profile: &SiteProfile) -> Vec<CrawlUrl> {
    let urls: Vec<&str> = discovered.iter().map(|(u, _)| u.as_str()).collect();
    let kept = filter_product_urls(&urls, TARGET_CATEGORIES);

    discovered
        .iter()
        .filter(|(u, _)| kept.iter().any(|k| k == u))
        .filter_map(|(raw, depth)| {
            let url = Url::parse(raw).ok()?;
            let host = url.host_str()?;
            if !profile.is_allowed_domain(host) {
                debug!(url = %raw, "outside allowed domains, skipping");
                return None;
            }
            Some(CrawlUrl::new(url, *depth, profile.key.clone()))
        })
        .collect()
}

/// One worker's journey for one URL: dedup, robots, politeness, fetch,
/// extract, pipeline. Every failure is counted and logged against this
/// URL alone.
#[allow(clippy::too_many_arguments)]
async fn process_url(
    cu: CrawlUrl,
    profile: &SiteProfile,
    settings: &RunSettings,
    page_fetcher: &PageFetcher,
    robots_policy: Option<&RobotsPolicy>,
    throttle: &AutoThrottle,
    site_limit: &Semaphore,
    seen: &DashSet<String>,
    stop: &AtomicBool,
    pipeline: &ItemPipeline,
    stats: &CrawlStats,
) {
    if stop.load(Ordering::SeqCst) {
        return;
    }

    // insert() is the atomic check-and-mark: of two workers racing on
    // the same fingerprint, exactly one proceeds
    if !seen.insert(cu.fingerprint()) {
        CrawlStats::incr(&stats.skipped_duplicate);
        return;
    }

    if let Some(robots) = robots_policy {
        if !robots.is_allowed(&profile.user_agent, cu.url.path()) {
            CrawlStats::incr(&stats.skipped_robots);
            debug!(url = %cu.url, "disallowed by robots policy, skipped");
            return;
        }
    }

    let permit = match site_limit.acquire().await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    tokio::time::sleep(throttle.next_delay()).await;

    let page = match page_fetcher.fetch(cu.url.as_str()).await {
        Ok(page) => {
            if page.from_cache {
                CrawlStats::incr(&stats.pages_from_cache);
            } else {
                throttle.record_response(page.latency);
                CrawlStats::incr(&stats.pages_fetched);
            }
            page
        }
        Err(e) => {
            throttle.record_failure();
            CrawlStats::incr(&stats.fetch_failures);
            warn!(url = %cu.url, error = %e, stage = "fetch", "URL abandoned");
            return;
        }
    };
    // The per-site ceiling bounds network time only; parsing and the
    // pipeline run outside it
    drop(permit);

    let html = page.text();
    let record = match extract_product(&html, &cu.url, profile) {
        Ok(record) => record,
        Err(e) => {
            CrawlStats::incr(&stats.extraction_failures);
            warn!(url = %cu.url, error = %e, stage = "extract", "no record produced");
            return;
        }
    };

    match pipeline.process(record).await {
        Ok(Some(_)) => {
            let exported = CrawlStats::incr(&stats.records_exported);
            if let Some(max) = settings.max_items {
                if exported >= max && !stop.swap(true, Ordering::SeqCst) {
                    info!(exported, "item ceiling reached, stopping dispatch");
                }
            }
        }
        Ok(None) => {
            CrawlStats::incr(&stats.records_dropped);
        }
        Err(e) => {
            CrawlStats::incr(&stats.pipeline_failures);
            warn!(url = %cu.url, error = %e, stage = "pipeline", "record lost");
        }
    }
}
