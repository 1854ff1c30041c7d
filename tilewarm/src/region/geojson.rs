//! GeoJSON region input.
//!
//! Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
//! `Polygon` and `MultiPolygon` geometries are used as-is; `Point` and
//! `MultiPoint` geometries are buffered with the configured radius. Any
//! other geometry type is skipped.

use std::path::Path;

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;
use tracing::warn;

use super::{buffer_point, RegionError};

type Position = Vec<f64>;
type Ring = Vec<Position>;

/// Any GeoJSON object. Features and collections nest through the same type.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection { features: Vec<GeoJson> },
    Feature { geometry: Option<Box<GeoJson>> },
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    GeometryCollection { geometries: Vec<GeoJson> },
    #[serde(other)]
    Unsupported,
}

/// Reads region polygons from GeoJSON bytes.
///
/// # Arguments
///
/// * `bytes` - GeoJSON document
/// * `point_buffer_m` - Radius in metres used to buffer point geometries
///
/// # Errors
///
/// Returns [`RegionError::Empty`] when the document holds no usable geometry.
pub fn read_geojson(bytes: &[u8], point_buffer_m: f64) -> Result<Vec<Polygon<f64>>, RegionError> {
    let document: GeoJson = serde_json::from_slice(bytes)?;

    let mut polygons = Vec::new();
    collect_polygons(document, point_buffer_m, &mut polygons)?;

    if polygons.is_empty() {
        return Err(RegionError::Empty);
    }
    Ok(polygons)
}

/// Reads region polygons from a GeoJSON file.
pub fn read_geojson_file(path: &Path, point_buffer_m: f64) -> Result<Vec<Polygon<f64>>, RegionError> {
    let bytes = std::fs::read(path).map_err(|source| RegionError::Read {
        path: path.display().to_string(),
        source,
    })?;
    read_geojson(&bytes, point_buffer_m)
}

fn collect_polygons(
    geometry: GeoJson,
    point_buffer_m: f64,
    out: &mut Vec<Polygon<f64>>,
) -> Result<(), RegionError> {
    match geometry {
        GeoJson::FeatureCollection { features } => {
            for feature in features {
                collect_polygons(feature, point_buffer_m, out)?;
            }
        }
        GeoJson::Feature { geometry } => {
            if let Some(geometry) = geometry {
                collect_polygons(*geometry, point_buffer_m, out)?;
            }
        }
        GeoJson::Point { coordinates } => {
            let c = to_coord(&coordinates)?;
            out.push(buffer_point(c.y, c.x, point_buffer_m));
        }
        GeoJson::MultiPoint { coordinates } => {
            for position in &coordinates {
                let c = to_coord(position)?;
                out.push(buffer_point(c.y, c.x, point_buffer_m));
            }
        }
        GeoJson::Polygon { coordinates } => out.push(to_polygon(&coordinates)?),
        GeoJson::MultiPolygon { coordinates } => {
            for rings in &coordinates {
                out.push(to_polygon(rings)?);
            }
        }
        GeoJson::GeometryCollection { geometries } => {
            for inner in geometries {
                collect_polygons(inner, point_buffer_m, out)?;
            }
        }
        GeoJson::Unsupported => {
            warn!("Skipping unsupported GeoJSON geometry (only points and polygons cover tiles)");
        }
    }
    Ok(())
}

fn to_coord(position: &[f64]) -> Result<Coord<f64>, RegionError> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(RegionError::InvalidGeometry(format!(
            "position {:?} must hold finite longitude and latitude",
            position
        ))),
    }
}

fn to_ring(ring: &[Position]) -> Result<LineString<f64>, RegionError> {
    if ring.len() < 4 {
        return Err(RegionError::InvalidGeometry(format!(
            "linear ring needs at least 4 positions, got {}",
            ring.len()
        )));
    }
    let coords = ring
        .iter()
        .map(|p| to_coord(p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::from(coords))
}

fn to_polygon(rings: &[Ring]) -> Result<Polygon<f64>, RegionError> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| RegionError::InvalidGeometry("polygon without exterior ring".to_string()))?;

    let interiors = interiors
        .iter()
        .map(|r| to_ring(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to_ring(exterior)?, interiors))
}
