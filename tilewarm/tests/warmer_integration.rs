//! Integration tests for the warming run.
//!
//! These tests drive [`Warmer`] through its public API with an in-memory
//! tile server:
//! - Region covering → zoom batches → URLs
//! - List mode and empty regions
//! - Failure isolation and retry accounting
//! - Concurrency bound under load
//!
//! Run with: `cargo test --test warmer_integration`

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use geo::Polygon;

use tilewarm::config::{parse_zoom_schedule, RunConfig, ZoomParam};
use tilewarm::coord::{CoverError, TileCover, WebMercatorCover};
use tilewarm::http::{TileClient, TileResponse, TransportError};
use tilewarm::region::{buffer_point, read_geojson};
use tilewarm::tile::TileCoordinate;
use tilewarm::warmer::{WarmEvent, WarmObserver, Warmer};

// ============================================================================
// Helper Types
// ============================================================================

/// In-memory tile server.
///
/// Every request takes `latency`; URLs listed in `statuses` answer with that
/// status, everything else with 200.
#[derive(Default)]
struct FakeTileServer {
    latency: Duration,
    statuses: HashMap<String, u16>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeTileServer {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn answer(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl TileClient for FakeTileServer {
    async fn request(&self, url: &str) -> Result<TileResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let status = self.statuses.get(url).copied().unwrap_or(200);
        Ok(TileResponse { status, bytes: 256 })
    }
}

/// Collects a one-line rendering of every event.
#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with(prefix))
            .collect()
    }
}

impl WarmObserver for EventLog {
    fn on_event(&self, event: &WarmEvent<'_>) {
        let line = match event {
            WarmEvent::NoAreaToCover => "no-area".to_string(),
            WarmEvent::TileListed { url } => format!("listed {}", url),
            WarmEvent::TileFailed { outcome, .. } => format!(
                "failed {} status={:?} attempts={}",
                outcome.url, outcome.status, outcome.attempts
            ),
            WarmEvent::TileRetry { url, retry, .. } => format!("retry {} #{}", url, retry),
            WarmEvent::BatchFinished { zoom, totals, .. } => format!(
                "batch {} processed={} failed={}",
                zoom, totals.processed, totals.failed
            ),
            other => format!("{:?}", other),
        };
        self.0.lock().unwrap().push(line);
    }
}

/// Covers any geometry with a row of tiles at every zoom.
struct RowCover(u32);

impl TileCover for RowCover {
    fn cover(&self, _geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError> {
        Ok((0..self.0).map(|x| TileCoordinate::new(x, 0, zoom)).collect())
    }
}

const TEMPLATE: &str = "http://x/{z}/{x}/{y}.png";

fn config(zooms: &[u8]) -> RunConfig {
    let mut config = RunConfig::new(TEMPLATE);
    config.zoom_levels = zooms.to_vec();
    config.max_retries = ZoomParam::Constant(0);
    config
}

fn london() -> Vec<Polygon<f64>> {
    vec![buffer_point(51.5, -0.12, 1_000.0)]
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_list_mode_covers_region_without_requests() {
    let warmer = Warmer::new(FakeTileServer::default());
    let log = EventLog::default();
    let mut config = config(&[0, 1, 2]);
    config.list_only = true;

    let summary = warmer
        .run(&config, &london(), &WebMercatorCover, &log)
        .await
        .unwrap();

    assert_eq!(summary.total_tiles, 3);
    assert_eq!(
        log.with_prefix("listed"),
        vec![
            "listed http://x/0/0/0.png",
            "listed http://x/1/0/0.png",
            "listed http://x/2/1/1.png",
        ]
    );
    assert!(warmer.client().requests().is_empty());
}

#[tokio::test]
async fn test_empty_region_is_not_an_error() {
    let warmer = Warmer::new(FakeTileServer::default());
    let log = EventLog::default();

    let summary = warmer
        .run(&config(&[7, 8]), &[], &WebMercatorCover, &log)
        .await
        .unwrap();

    assert_eq!(summary.total_tiles, 0);
    assert_eq!(summary.totals.processed, 0);
    assert_eq!(log.lines(), vec!["no-area"]);
    assert!(warmer.client().requests().is_empty());
}

#[tokio::test]
async fn test_one_failing_tile_among_ten() {
    let server = FakeTileServer::default().answer("http://x/9/4/0.png", 404);
    let warmer = Warmer::new(server);
    let log = EventLog::default();
    let mut config = config(&[9]);
    config.concurrency = ZoomParam::Constant(4);

    let summary = warmer
        .run(&config, &london(), &RowCover(10), &log)
        .await
        .unwrap();

    assert_eq!(summary.totals.processed, 10);
    assert_eq!(summary.failed(), 1);
    assert_eq!(warmer.client().requests().len(), 10);
    assert_eq!(
        log.with_prefix("failed"),
        vec!["failed http://x/9/4/0.png status=Some(404) attempts=1"]
    );
    assert_eq!(
        log.with_prefix("batch"),
        vec!["batch 9 processed=10 failed=1"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_tile_uses_retry_budget() {
    let server = FakeTileServer::default().answer("http://x/3/1/0.png", 500);
    let warmer = Warmer::new(server);
    let log = EventLog::default();
    let mut config = config(&[3]);
    config.max_retries = ZoomParam::Constant(2);
    config.retry_base_timeout_ms = ZoomParam::Constant(50);

    let summary = warmer
        .run(&config, &london(), &RowCover(2), &log)
        .await
        .unwrap();

    assert_eq!(summary.failed(), 1);
    // One request for the healthy tile, three for the failing one
    assert_eq!(warmer.client().requests().len(), 4);
    assert_eq!(summary.totals.attempts, 4);
    assert_eq!(summary.totals.retries(), 2);
    assert_eq!(
        log.with_prefix("retry"),
        vec!["retry http://x/3/1/0.png #1", "retry http://x/3/1/0.png #2"]
    );
    assert_eq!(
        log.with_prefix("failed"),
        vec!["failed http://x/3/1/0.png status=Some(500) attempts=3"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_bound_per_zoom() {
    let warmer = Warmer::new(FakeTileServer::with_latency(Duration::from_millis(20)));
    let log = EventLog::default();
    let mut config = config(&[4, 5]);
    config.concurrency = parse_zoom_schedule("concurrency", "3,5=10").unwrap();

    warmer
        .run(&config, &london(), &RowCover(25), &log)
        .await
        .unwrap();

    assert_eq!(warmer.client().requests().len(), 50);
    assert_eq!(warmer.client().peak.load(Ordering::SeqCst), 10);
    assert_eq!(
        log.with_prefix("batch"),
        vec![
            "batch 4 processed=25 failed=0",
            "batch 5 processed=25 failed=0"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_low_concurrency_is_never_exceeded() {
    let warmer = Warmer::new(FakeTileServer::with_latency(Duration::from_millis(20)));
    let mut config = config(&[6]);
    config.concurrency = ZoomParam::Constant(3);

    warmer
        .run(&config, &london(), &RowCover(25), &EventLog::default())
        .await
        .unwrap();

    assert_eq!(warmer.client().peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_geojson_region_end_to_end() {
    let geojson = br#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Point", "coordinates": [-0.12, 51.5] } },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Point", "coordinates": [-0.121, 51.501] } }
        ]
    }"#;
    let polygons = read_geojson(geojson, 500.0).unwrap();
    assert_eq!(polygons.len(), 2);

    let warmer = Warmer::new(FakeTileServer::default());
    let summary = warmer
        .run(&config(&[0, 2]), &polygons, &WebMercatorCover, &EventLog::default())
        .await
        .unwrap();

    // Both points fall into the same tile at each zoom
    assert_eq!(summary.total_tiles, 2);
    assert_eq!(
        warmer.client().requests(),
        vec!["http://x/0/0/0.png", "http://x/2/1/1.png"]
    );
}
