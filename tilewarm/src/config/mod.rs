//! Run configuration.
//!
//! [`RunConfig`] is the validated, immutable input of a warming run. It is
//! assembled by the CLI from command-line flags layered over an optional
//! INI file ([`ConfigFile`]) layered over the defaults in this module.
//!
//! Request tuning that may differ per zoom level (concurrency, retries,
//! backoff) is expressed as a [`ZoomParam`] and evaluated once per batch.

mod file;
mod parser;
mod zoom_param;

pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use parser::{
    parse_backoff, parse_buffer, parse_header, parse_point, parse_zoom_levels, parse_zoom_schedule,
    validate_template,
};
pub use zoom_param::ZoomParam;

use std::path::PathBuf;
use std::time::Duration;

use geo::Polygon;
use thiserror::Error;

use crate::coord::MAX_ZOOM;
use crate::region::{buffer_point, read_geojson_file, Distance, RegionError};
use crate::retry::{Backoff, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS};

// =============================================================================
// Defaults
// =============================================================================

/// Default buffer around a point region.
pub const DEFAULT_BUFFER: &str = "10km";

/// Default zoom levels.
pub const DEFAULT_ZOOM: &str = "7-16";

/// Default HTTP method.
pub const DEFAULT_METHOD: &str = "GET";

/// Default number of concurrent requests.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default number of settled tiles between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50;

/// Configuration errors, raised before any tile is requested.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error(
        "Invalid zoom levels '{0}': expected a range like 7-16 or a list like 3,5,7 (0-{max})",
        max = MAX_ZOOM
    )]
    InvalidZoom(String),

    #[error("Invalid buffer '{0}'")]
    InvalidBuffer(String),

    #[error("Invalid point '{0}': expected 'lat,lng'")]
    InvalidPoint(String),

    #[error("Invalid backoff: {0}")]
    InvalidBackoff(String),

    #[error("Invalid header '{0}': expected 'Name: value'")]
    InvalidHeader(String),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidSchedule {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Concurrency must be at least 1 (zoom level {zoom})")]
    ZeroConcurrency { zoom: u8 },

    #[error("Progress interval must be at least 1")]
    ZeroProgressInterval,

    #[error("When --point is set, --buffer must also be set")]
    PointWithoutBuffer,

    #[error("Specify exactly one region source: --point or --geojson")]
    RegionSource,

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Where the region to warm comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSpec {
    /// A point buffered into a circle.
    Point { lat: f64, lon: f64, buffer: Distance },
    /// A GeoJSON file; point features are buffered with `buffer`.
    GeoJson { path: PathBuf, buffer: Distance },
}

impl RegionSpec {
    /// Resolves the region source from raw option values.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one of `point` / `geojson` is given, or when a
    /// point comes without a buffer.
    pub fn from_options(
        point: Option<&str>,
        geojson: Option<PathBuf>,
        buffer: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let buffer = buffer.map(str::trim).filter(|b| !b.is_empty());

        match (point, geojson) {
            (Some(point), None) => {
                let buffer = buffer.ok_or(ConfigError::PointWithoutBuffer)?;
                let (lat, lon) = parse_point(point)?;
                Ok(Self::Point {
                    lat,
                    lon,
                    buffer: parse_buffer(buffer)?,
                })
            }
            (None, Some(path)) => Ok(Self::GeoJson {
                path,
                buffer: parse_buffer(buffer.unwrap_or(DEFAULT_BUFFER))?,
            }),
            _ => Err(ConfigError::RegionSource),
        }
    }

    /// Builds the region polygons.
    pub fn load(&self) -> Result<Vec<Polygon<f64>>, RegionError> {
        match self {
            Self::Point { lat, lon, buffer } => Ok(vec![buffer_point(*lat, *lon, buffer.meters())]),
            Self::GeoJson { path, buffer } => read_geojson_file(path, buffer.meters()),
        }
    }
}

/// Validated input of a warming run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Tile URL template with `{x}`, `{y}` and `{z}` placeholders.
    pub url_template: String,
    /// HTTP method used for every request.
    pub method: String,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Zoom levels to warm, ascending and unique.
    pub zoom_levels: Vec<u8>,
    /// Requests in flight per zoom level.
    pub concurrency: ZoomParam<usize>,
    /// Retries after a failed first attempt, per zoom level.
    pub max_retries: ZoomParam<u32>,
    /// Base backoff in milliseconds, per zoom level.
    pub retry_base_timeout_ms: ZoomParam<u64>,
    /// How the delay grows between retries.
    pub backoff: Backoff,
    /// Only list tile URLs, do not request them.
    pub list_only: bool,
    /// Log every tile, not just failures and summaries.
    pub verbose: bool,
    /// Settled tiles between progress reports within a batch.
    pub progress_interval: u64,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl RunConfig {
    /// Creates a configuration with defaults for everything but the template.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            method: DEFAULT_METHOD.to_string(),
            headers: Vec::new(),
            // DEFAULT_ZOOM
            zoom_levels: (7..=16).collect(),
            concurrency: ZoomParam::Constant(DEFAULT_CONCURRENCY),
            max_retries: ZoomParam::Constant(DEFAULT_MAX_RETRIES),
            retry_base_timeout_ms: ZoomParam::Constant(DEFAULT_RETRY_BASE_DELAY_MS),
            backoff: Backoff::Linear,
            list_only: false,
            verbose: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            timeout: None,
        }
    }

    /// Checks the invariants the core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_template(&self.url_template)?;

        let ascending = self.zoom_levels.windows(2).all(|w| w[0] < w[1]);
        let in_range = self.zoom_levels.iter().all(|z| *z <= MAX_ZOOM);
        if self.zoom_levels.is_empty() || !ascending || !in_range {
            return Err(ConfigError::InvalidZoom(format!("{:?}", self.zoom_levels)));
        }

        if let Some(&zoom) = self
            .zoom_levels
            .iter()
            .find(|z| self.concurrency.at(**z) == 0)
        {
            return Err(ConfigError::ZeroConcurrency { zoom });
        }

        if self.progress_interval == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }
        Ok(())
    }

    /// Retry policy for one zoom level.
    pub fn retry_policy(&self, zoom: u8) -> RetryPolicy {
        RetryPolicy::from_backoff(
            self.backoff,
            self.max_retries.at(zoom),
            Duration::from_millis(self.retry_base_timeout_ms.at(zoom)),
        )
    }
}
