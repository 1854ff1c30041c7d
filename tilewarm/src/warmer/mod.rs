//! Cache warming orchestration.
//!
//! [`Warmer`] turns a region into tile requests and drives them through the
//! retry wrapper and the bounded pool, one zoom level at a time.
//!
//! # Workflow
//!
//! 1. Cover the region at every zoom level and group the tiles into batches
//! 2. Stop early when no tile is covered
//! 3. In list mode, report every URL and stop
//! 4. Warm each batch: fresh zoom stats, per-zoom concurrency and retry
//!    policy, one pool run
//! 5. Report run totals
//!
//! Everything the caller sees goes through a [`WarmObserver`]. Failed tiles
//! are reported and counted; they never abort the run.
//!
//! # Example
//!
//! ```ignore
//! let client = ReqwestTileClient::new(&config.method, &config.headers, config.timeout)?;
//! let summary = Warmer::new(client)
//!     .run(&config, &polygons, &WebMercatorCover, &reporter)
//!     .await?;
//! ```

mod events;
mod outcome;

pub use events::{NullObserver, ProgressReport, WarmEvent, WarmObserver};
pub use outcome::RequestOutcome;

use std::time::Duration;

use geo::Polygon;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::coord::{CoverError, TileCover};
use crate::http::TileClient;
use crate::pool::{PoolError, WorkerPool};
use crate::retry::{retry, RetryAttempt, RetryPolicy};
use crate::stats::{Accumulator, Stats, StatsScope};
use crate::tile::{build_tiles, group_by_zoom, ZoomBatch};
use outcome::AttemptError;

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WarmError {
    #[error("Failed to compute tiles: {0}")]
    Cover(#[from] CoverError),

    #[error("Invalid concurrency for zoom level {zoom}: {source}")]
    Pool {
        zoom: u8,
        #[source]
        source: PoolError,
    },
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Tiles covered by the region across all zoom levels.
    pub total_tiles: usize,
    /// Run-scoped totals. All zero for empty and list-only runs.
    pub totals: Accumulator,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> u64 {
        self.totals.failed
    }
}

/// A settled tile and its wall time including retries and backoff.
struct SettledTile {
    outcome: RequestOutcome,
    processing: Duration,
}

/// Drives warming runs against one [`TileClient`].
#[derive(Debug)]
pub struct Warmer<C> {
    client: C,
}

impl<C: TileClient> Warmer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Warms every tile covering `geometries` at the configured zoom levels.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `geometries` - Region polygons in lon/lat degrees
    /// * `cover` - Polygon to tile covering
    /// * `observer` - Receives progress events
    ///
    /// # Errors
    ///
    /// Only a covering failure or a zero concurrency aborts the run.
    /// Individual tile failures are part of the summary.
    pub async fn run<V>(
        &self,
        config: &RunConfig,
        geometries: &[Polygon<f64>],
        cover: &V,
        observer: &dyn WarmObserver,
    ) -> Result<RunSummary, WarmError>
    where
        V: TileCover + ?Sized,
    {
        let started = Instant::now();

        // Step 1: Build all batches up front
        let tiles = build_tiles(geometries, &config.zoom_levels, cover)?;
        let batches = group_by_zoom(&tiles, &config.url_template);
        let total_tiles = tiles.len();

        // Step 2: Nothing to do
        if total_tiles == 0 {
            info!(zoom_levels = ?config.zoom_levels, "Region covers no tiles");
            observer.on_event(&WarmEvent::NoAreaToCover);
            return Ok(RunSummary {
                total_tiles,
                totals: Accumulator::default(),
                elapsed: started.elapsed(),
            });
        }

        let shape: Vec<(u8, usize)> = batches.iter().map(|b| (b.zoom, b.len())).collect();
        observer.on_event(&WarmEvent::RunStarted {
            total_tiles,
            batches: &shape,
            list_only: config.list_only,
        });

        // Step 3: List mode
        if config.list_only {
            for url in batches.iter().flat_map(|b| b.urls.iter()) {
                observer.on_event(&WarmEvent::TileListed { url: url.as_str() });
            }
            let summary = RunSummary {
                total_tiles,
                totals: Accumulator::default(),
                elapsed: started.elapsed(),
            };
            observer.on_event(&WarmEvent::RunFinished { summary: &summary });
            return Ok(summary);
        }

        // Step 4: Warm batch by batch
        let mut stats = Stats::new();
        for batch in batches {
            self.warm_batch(config, batch, total_tiles as u64, &mut stats, observer)
                .await?;
        }

        // Step 5: Finalize
        let summary = RunSummary {
            total_tiles,
            totals: stats.scope(StatsScope::Run).clone(),
            elapsed: started.elapsed(),
        };
        info!(
            tiles = total_tiles,
            failed = summary.failed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Warming run finished"
        );
        observer.on_event(&WarmEvent::RunFinished { summary: &summary });
        Ok(summary)
    }

    async fn warm_batch(
        &self,
        config: &RunConfig,
        batch: ZoomBatch,
        run_total: u64,
        stats: &mut Stats,
        observer: &dyn WarmObserver,
    ) -> Result<(), WarmError> {
        let zoom = batch.zoom;
        let total = batch.len() as u64;

        // Per-zoom parameters are evaluated once for the whole batch
        let pool = WorkerPool::new(config.concurrency.at(zoom))
            .map_err(|source| WarmError::Pool { zoom, source })?;
        let policy = config.retry_policy(zoom);
        let concurrency = pool.effective_concurrency(batch.len());

        stats.reset_zoom();
        let started = Instant::now();

        debug!(
            zoom = zoom,
            tiles = total,
            concurrency = concurrency,
            max_retries = policy.max_retries(),
            "Starting zoom batch"
        );
        observer.on_event(&WarmEvent::BatchStarted {
            zoom,
            tiles: batch.len(),
            concurrency,
            max_retries: policy.max_retries(),
        });

        let interval = config.progress_interval.max(1);
        let verbose = config.verbose;
        let on_settled = |tile: &SettledTile| {
            stats.record(&tile.outcome, tile.processing);

            if !tile.outcome.is_success() {
                observer.on_event(&WarmEvent::TileFailed {
                    zoom,
                    outcome: &tile.outcome,
                });
            } else if verbose {
                observer.on_event(&WarmEvent::TileSucceeded {
                    zoom,
                    outcome: &tile.outcome,
                });
            }

            let batch_stats = stats.scope(StatsScope::Zoom);
            let done = batch_stats.processed;
            if done % interval == 0 || done == total {
                let run_done = stats.scope(StatsScope::Run).processed;
                observer.on_event(&WarmEvent::Progress(ProgressReport {
                    zoom,
                    done,
                    total,
                    failed: batch_stats.failed,
                    average_response_time: batch_stats.average_response_time(),
                    eta: stats.estimated_time_remaining(
                        StatsScope::Zoom,
                        total - done,
                        concurrency,
                    ),
                    run_done,
                    run_total,
                    run_eta: stats.estimated_time_remaining(
                        StatsScope::Run,
                        run_total.saturating_sub(run_done),
                        concurrency,
                    ),
                }));
            }
        };

        pool.run_with(
            batch.urls,
            |url| self.warm_tile(url, &policy, observer),
            on_settled,
        )
        .await;

        let elapsed = started.elapsed();
        let totals = stats.scope(StatsScope::Zoom);
        info!(
            zoom = zoom,
            tiles = totals.processed,
            failed = totals.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Zoom batch finished"
        );
        observer.on_event(&WarmEvent::BatchFinished {
            zoom,
            totals,
            elapsed,
        });
        Ok(())
    }

    /// Requests one tile until it succeeds or the retry budget is spent.
    async fn warm_tile(
        &self,
        url: String,
        policy: &RetryPolicy,
        observer: &dyn WarmObserver,
    ) -> SettledTile {
        let started = Instant::now();
        let max_retries = policy.max_retries();

        let retried = {
            let url: &str = &url;
            retry(
                policy,
                move |_attempt| self.attempt(url),
                move |r: RetryAttempt<'_, AttemptError>| {
                    let reason = r.error.to_string();
                    observer.on_event(&WarmEvent::TileRetry {
                        url,
                        retry: r.retry,
                        max_retries,
                        delay: r.delay,
                        reason: &reason,
                    });
                },
            )
            .await
        };

        SettledTile {
            outcome: RequestOutcome::from_retried(url, retried),
            processing: started.elapsed(),
        }
    }

    async fn attempt(&self, url: &str) -> Result<outcome::Exchange, AttemptError> {
        let sent = Instant::now();
        let result = self.client.request(url).await;
        AttemptError::classify(result, sent.elapsed())
    }
}
