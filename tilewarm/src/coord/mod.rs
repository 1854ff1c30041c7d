//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, plus the [`TileCover`] seam used to
//! turn a region polygon into the tiles it touches.

mod cover;

pub use cover::{TileCover, WebMercatorCover};

use std::f64::consts::PI;

use geo::{coord, Rect};
use thiserror::Error;

use crate::tile::TileCoordinate;

/// Northern limit of the Web Mercator projection.
pub const MAX_LAT: f64 = 85.051_128_78;

/// Southern limit of the Web Mercator projection.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Western limit of the tile grid.
pub const MIN_LON: f64 = -180.0;

/// Eastern limit of the tile grid.
pub const MAX_LON: f64 = 180.0;

/// Deepest supported zoom level (2^30 tiles per axis still fits in `u32`).
pub const MAX_ZOOM: u8 = 30;

/// Errors raised while converting coordinates or covering a geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverError {
    #[error("Invalid latitude {0}: must be between {min} and {max}", min = MIN_LAT, max = MAX_LAT)]
    InvalidLatitude(f64),

    #[error("Invalid longitude {0}: must be between {min} and {max}", min = MIN_LON, max = MAX_LON)]
    InvalidLongitude(f64),

    #[error("Invalid zoom level {0}: must be at most {max}", max = MAX_ZOOM)]
    InvalidZoom(u8),

    #[error("Geometry has non-finite coordinates")]
    NonFiniteGeometry,
}

/// Number of tiles along one axis at `zoom`.
#[inline]
fn tiles_per_axis(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

/// Converts geographic coordinates to the tile containing them.
///
/// Points on the eastern or southern edge of the grid map to the last
/// column/row rather than one past it.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 30)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoordinate, CoverError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoverError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoverError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoverError::InvalidZoom(zoom));
    }

    let n = tiles_per_axis(zoom);
    let last = n as u32 - 1;

    let x = ((lon + 180.0) / 360.0 * n) as u32;

    // Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

    Ok(TileCoordinate::new(x.min(last), y.min(last), zoom))
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoordinate) -> (f64, f64) {
    let n = tiles_per_axis(tile.z);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Returns the tile's extent as a lon/lat rectangle (x = longitude).
pub fn tile_bounds(tile: &TileCoordinate) -> Rect<f64> {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoordinate::new(tile.x + 1, tile.y + 1, tile.z));

    Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
}
