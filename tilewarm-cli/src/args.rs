//! Command-line arguments and their merge with the config file.
//!
//! Precedence: flag, then config file, then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tilewarm::config::{
    parse_backoff, parse_header, parse_zoom_levels, parse_zoom_schedule, ConfigError, ConfigFile,
    RegionSpec, RunConfig, DEFAULT_BUFFER,
};

#[derive(Debug, Parser)]
#[command(name = "tilewarm", version)]
#[command(
    about = "Warm a tile server's cache for a region and a range of zoom levels",
    long_about = None
)]
pub struct Args {
    /// Tile URL template, e.g. https://tiles.example.com/{z}/{x}/{y}.png
    pub url: String,

    /// Center of the region as "lat,lng" in decimal degrees
    #[arg(short, long, value_name = "LAT,LNG", allow_hyphen_values = true)]
    pub point: Option<String>,

    /// Buffer around the point (or around GeoJSON points): 10km, 5mi, 250m
    #[arg(short, long, value_name = "DISTANCE")]
    pub buffer: Option<String>,

    /// GeoJSON file with the region (Polygon, MultiPolygon or Point features)
    #[arg(short, long, value_name = "FILE")]
    pub geojson: Option<PathBuf>,

    /// Zoom levels: a range (7-16) or a list (3,5,7) [default: 7-16]
    #[arg(short, long, value_name = "ZOOMS")]
    pub zoom: Option<String>,

    /// Only print the tile URLs, do not request them
    #[arg(short, long)]
    pub list: bool,

    /// HTTP method [default: GET]
    #[arg(short, long)]
    pub method: Option<String>,

    /// Extra request header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Concurrent requests, optionally per zoom: 4 or 4,15-18=16 [default: 1]
    #[arg(short, long, value_name = "N")]
    pub concurrency: Option<String>,

    /// Retries after a failed request, optionally per zoom [default: 5]
    #[arg(short = 'r', long, value_name = "N")]
    pub max_retries: Option<String>,

    /// Base retry delay in milliseconds, optionally per zoom [default: 500]
    #[arg(long, value_name = "MS")]
    pub retry_base_timeout: Option<String>,

    /// Retry delay growth: linear, fixed or exponential [default: linear]
    #[arg(long, value_name = "STRATEGY")]
    pub backoff: Option<String>,

    /// Per-request timeout in seconds (unset waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report progress every N tiles [default: 50]
    #[arg(long, value_name = "N")]
    pub progress_every: Option<u64>,

    /// Config file [default: ~/.config/tilewarm/config.ini]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log every tile and debug output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything needed to start a run.
#[derive(Debug)]
pub struct Invocation {
    pub config: RunConfig,
    pub region: RegionSpec,
}

impl Args {
    /// Merges the flags over `file` and validates the result.
    pub fn resolve(&self, file: &ConfigFile) -> Result<Invocation, ConfigError> {
        let mut config = RunConfig::new(self.url.trim());

        if let Some(method) = self.method.as_deref().or(file.method.as_deref()) {
            config.method = method.trim().to_uppercase();
        }

        // File headers first so a flag with the same name wins
        config.headers = file.headers.clone();
        for header in &self.headers {
            config.headers.push(parse_header(header)?);
        }

        match &self.zoom {
            Some(zoom) => config.zoom_levels = parse_zoom_levels(zoom)?,
            None => {
                if let Some(zoom) = &file.zoom {
                    config.zoom_levels = zoom.clone();
                }
            }
        }

        config.concurrency = match &self.concurrency {
            Some(s) => parse_zoom_schedule("concurrency", s)?,
            None => file.concurrency.clone().unwrap_or(config.concurrency),
        };
        config.max_retries = match &self.max_retries {
            Some(s) => parse_zoom_schedule("max-retries", s)?,
            None => file.max_retries.clone().unwrap_or(config.max_retries),
        };
        config.retry_base_timeout_ms = match &self.retry_base_timeout {
            Some(s) => parse_zoom_schedule("retry-base-timeout", s)?,
            None => file
                .retry_base_timeout_ms
                .clone()
                .unwrap_or(config.retry_base_timeout_ms),
        };
        config.backoff = match &self.backoff {
            Some(s) => parse_backoff(s)?,
            None => file.backoff.unwrap_or_default(),
        };

        config.timeout = self
            .timeout
            .or(file.timeout_secs)
            .map(Duration::from_secs);
        if let Some(interval) = self.progress_every.or(file.progress_interval) {
            config.progress_interval = interval;
        }
        config.list_only = self.list;
        config.verbose = self.verbose;

        config.validate()?;

        let buffer = self
            .buffer
            .as_deref()
            .or(file.buffer.as_deref())
            .unwrap_or(DEFAULT_BUFFER);
        let region = RegionSpec::from_options(self.point.as_deref(), self.geojson.clone(), Some(buffer))?;

        Ok(Invocation { config, region })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewarm::config::ZoomParam;
    use tilewarm::retry::Backoff;

    const URL: &str = "https://tiles.example.com/{z}/{x}/{y}.png";

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tilewarm", URL];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_with_point() {
        let invocation = args(&["-p", "41.38,2.17"])
            .resolve(&ConfigFile::default())
            .unwrap();

        let config = invocation.config;
        assert_eq!(config.method, "GET");
        assert_eq!(config.zoom_levels, (7..=16).collect::<Vec<u8>>());
        assert_eq!(config.concurrency.at(10), 1);
        assert_eq!(config.max_retries.at(10), 5);
        assert_eq!(config.retry_base_timeout_ms.at(10), 500);
        assert_eq!(config.progress_interval, 50);
        assert!(config.timeout.is_none());
        assert!(!config.list_only);

        match invocation.region {
            RegionSpec::Point { lat, lon, buffer } => {
                assert_eq!((lat, lon), (41.38, 2.17));
                assert_eq!(buffer.meters(), 10_000.0);
            }
            other => panic!("unexpected region {:?}", other),
        }
    }

    #[test]
    fn test_negative_coordinates_parse() {
        let invocation = args(&["-p", "-33.86,151.2", "-b", "2km"])
            .resolve(&ConfigFile::default())
            .unwrap();
        assert!(matches!(
            invocation.region,
            RegionSpec::Point { lat, .. } if lat == -33.86
        ));
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = ConfigFile {
            method: Some("HEAD".to_string()),
            concurrency: Some(ZoomParam::Constant(8)),
            zoom: Some(vec![3, 4]),
            timeout_secs: Some(10),
            headers: vec![("X-Key".to_string(), "file".to_string())],
            ..ConfigFile::default()
        };

        let invocation = args(&["-p", "1,1", "-c", "2,14-16=12", "-H", "X-Key: flag", "-l"])
            .resolve(&file)
            .unwrap();
        let config = invocation.config;

        assert_eq!(config.method, "HEAD");
        assert_eq!(config.zoom_levels, vec![3, 4]);
        assert_eq!(config.concurrency.at(3), 2);
        assert_eq!(config.concurrency.at(15), 12);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            config.headers,
            vec![
                ("X-Key".to_string(), "file".to_string()),
                ("X-Key".to_string(), "flag".to_string())
            ]
        );
        assert!(config.list_only);
    }

    #[test]
    fn test_backoff_flag_over_config_file() {
        let file = ConfigFile {
            backoff: Some(Backoff::Exponential),
            ..ConfigFile::default()
        };

        let from_file = args(&["-p", "1,1"]).resolve(&file).unwrap();
        assert_eq!(from_file.config.backoff, Backoff::Exponential);

        let from_flag = args(&["-p", "1,1", "--backoff", "fixed"]).resolve(&file).unwrap();
        assert_eq!(from_flag.config.backoff, Backoff::Fixed);

        let result = args(&["-p", "1,1", "--backoff", "random"]).resolve(&file);
        assert!(matches!(result, Err(ConfigError::InvalidBackoff(_))));
    }

    #[test]
    fn test_region_source_required() {
        let result = args(&[]).resolve(&ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::RegionSource)));
    }

    #[test]
    fn test_point_and_geojson_conflict() {
        let result = args(&["-p", "1,1", "-g", "r.geojson"]).resolve(&ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::RegionSource)));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let argv = ["tilewarm", "https://tiles.example.com/{z}/{x}.png", "-p", "1,1"];
        let result = Args::try_parse_from(argv)
            .unwrap()
            .resolve(&ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = args(&["-p", "1,1", "-c", "0"]).resolve(&ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::ZeroConcurrency { .. })));
    }
}
