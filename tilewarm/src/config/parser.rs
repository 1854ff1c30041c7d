//! Parsers for user-supplied option strings.
//!
//! Shared by the command line and the INI file so both accept exactly the
//! same syntax.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::{ConfigError, ZoomParam};
use crate::coord::MAX_ZOOM;
use crate::region::Distance;
use crate::retry::Backoff;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").unwrap())
}

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://[^\s/]+").unwrap())
}

/// Checks that a URL template is an http(s) URL holding `{x}`, `{y}` and
/// `{z}` and no other placeholder.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    if !scheme_pattern().is_match(template) {
        return Err(invalid("must start with http:// or https://".to_string()));
    }

    let found: BTreeSet<&str> = placeholder_pattern()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if let Some(unknown) = found.iter().find(|p| !["x", "y", "z"].contains(p)) {
        return Err(invalid(format!(
            "unknown placeholder {{{}}} (only {{x}}, {{y}} and {{z}} are supported)",
            unknown
        )));
    }

    let missing: Vec<String> = ["x", "y", "z"]
        .iter()
        .filter(|p| !found.contains(*p))
        .map(|p| format!("{{{}}}", p))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!("missing {}", missing.join(", "))));
    }

    Ok(())
}

fn parse_zoom(s: &str, original: &str) -> Result<u8, ConfigError> {
    s.trim()
        .parse::<u8>()
        .ok()
        .filter(|z| *z <= MAX_ZOOM)
        .ok_or_else(|| ConfigError::InvalidZoom(original.to_string()))
}

/// Parses zoom levels: a range (`7-16`), a list (`3,5,7`) or a single level.
///
/// The result is sorted ascending with duplicates removed.
pub fn parse_zoom_levels(s: &str) -> Result<Vec<u8>, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ConfigError::InvalidZoom(s.to_string()));
    }

    if let Some((min, max)) = s.split_once('-') {
        let min = parse_zoom(min, s)?;
        let max = parse_zoom(max, s)?;
        if min > max {
            return Err(ConfigError::InvalidZoom(s.to_string()));
        }
        return Ok((min..=max).collect());
    }

    let levels = s
        .split(',')
        .map(|part| parse_zoom(part, s))
        .collect::<Result<BTreeSet<u8>, _>>()?;
    Ok(levels.into_iter().collect())
}

/// Parses a buffer distance such as `10km`, `5mi` or `250m`.
pub fn parse_buffer(s: &str) -> Result<Distance, ConfigError> {
    s.parse::<Distance>()
        .map_err(|_| ConfigError::InvalidBuffer(s.to_string()))
}

/// Parses a `lat,lng` pair in degrees.
pub fn parse_point(s: &str) -> Result<(f64, f64), ConfigError> {
    let invalid = || ConfigError::InvalidPoint(s.to_string());

    let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }
    Ok((lat, lng))
}

/// Parses a backoff strategy name.
pub fn parse_backoff(s: &str) -> Result<Backoff, ConfigError> {
    s.parse::<Backoff>().map_err(ConfigError::InvalidBackoff)
}

/// Parses a `Name: value` request header.
pub fn parse_header(s: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidHeader(s.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidHeader(s.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a per-zoom value schedule.
///
/// Comma-separated entries; a bare value is the default, `Z=value` or
/// `A-B=value` override single levels or ranges. `4,15-18=16` means 16 for
/// zoom 15 to 18 and 4 everywhere else. Exactly one default is required.
///
/// # Arguments
///
/// * `name` - Option name, used in error messages
/// * `s` - Schedule text
pub fn parse_zoom_schedule<T>(name: &str, s: &str) -> Result<ZoomParam<T>, ConfigError>
where
    T: FromStr + Clone,
    T::Err: Display,
{
    let invalid = |reason: String| ConfigError::InvalidSchedule {
        name: name.to_string(),
        value: s.to_string(),
        reason,
    };
    let parse_value = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|e| invalid(format!("'{}': {}", v.trim(), e)))
    };

    let mut default = None;
    let mut overrides = Vec::new();

    for entry in s.split(',').map(str::trim) {
        match entry.split_once('=') {
            Some((zooms, value)) => {
                let levels = parse_zoom_levels(zooms)
                    .map_err(|_| invalid(format!("invalid zoom range '{}'", zooms)))?;
                let range = match (levels.first(), levels.last()) {
                    (Some(first), Some(last)) if levels.len() == usize::from(last - first) + 1 => {
                        *first..=*last
                    }
                    _ => return Err(invalid(format!("'{}' is not a zoom range", zooms))),
                };
                overrides.push((range, parse_value(value)?));
            }
            None => {
                if default.is_some() {
                    return Err(invalid("more than one default value".to_string()));
                }
                default = Some(parse_value(entry)?);
            }
        }
    }

    let default = default.ok_or_else(|| invalid("missing default value".to_string()))?;
    if overrides.is_empty() {
        Ok(ZoomParam::Constant(default))
    } else {
        Ok(ZoomParam::Schedule { default, overrides })
    }
}
