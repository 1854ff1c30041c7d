//! Region covering: which tiles does a polygon touch at a given zoom?

use geo::{BoundingRect, Polygon, Relate, Translate};

use super::{tile_bounds, to_tile_coords, CoverError, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON};
use crate::tile::TileCoordinate;

/// Computes the tiles a geometry intersects at one zoom level.
///
/// Implementations must be deterministic for a given geometry/zoom pair.
/// The order of the returned tiles does not matter; the work list is sorted
/// and deduplicated afterwards.
pub trait TileCover {
    fn cover(&self, geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError>;
}

/// Covering over the standard Web Mercator `z/x/y` grid.
///
/// Walks the tile range spanned by the polygon's bounding box and keeps the
/// tiles that share area with the polygon itself, so a circular region does
/// not pull in the corners of its bounding square and a tile that only
/// touches the polygon's edge is skipped.
///
/// Longitudes past ±180° (a buffered point near the antimeridian) are
/// covered again on the opposite side of the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorCover;

impl TileCover for WebMercatorCover {
    fn cover(&self, geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError> {
        if zoom > MAX_ZOOM {
            return Err(CoverError::InvalidZoom(zoom));
        }

        let Some(rect) = geometry.bounding_rect() else {
            return Ok(Vec::new());
        };

        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(CoverError::NonFiniteGeometry);
        }

        let mut tiles = cover_world(geometry, zoom)?;
        if max.x > MAX_LON {
            tiles.extend(cover_world(&geometry.translate(-360.0, 0.0), zoom)?);
        }
        if min.x < MIN_LON {
            tiles.extend(cover_world(&geometry.translate(360.0, 0.0), zoom)?);
        }

        Ok(tiles)
    }
}

/// Covers the part of `geometry` that lies on the -180°..180° grid.
fn cover_world(geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError> {
    let Some(rect) = geometry.bounding_rect() else {
        return Ok(Vec::new());
    };
    let (min, max) = (rect.min(), rect.max());
    if min.x > MAX_LON || max.x < MIN_LON {
        return Ok(Vec::new());
    }

    let west = min.x.clamp(MIN_LON, MAX_LON);
    let east = max.x.clamp(MIN_LON, MAX_LON);
    let south = min.y.clamp(MIN_LAT, MAX_LAT);
    let north = max.y.clamp(MIN_LAT, MAX_LAT);

    // Tile rows grow southwards, so the north-west corner holds the minimums.
    let top_left = to_tile_coords(north, west, zoom)?;
    let bottom_right = to_tile_coords(south, east, zoom)?;

    let mut tiles = Vec::new();
    for x in top_left.x..=bottom_right.x {
        for y in top_left.y..=bottom_right.y {
            let tile = TileCoordinate::new(x, y, zoom);
            if shares_area(geometry, &tile) {
                tiles.push(tile);
            }
        }
    }

    Ok(tiles)
}

/// True when the polygon and the tile overlap beyond a shared boundary.
fn shares_area(geometry: &Polygon<f64>, tile: &TileCoordinate) -> bool {
    let im = geometry.relate(&tile_bounds(tile).to_polygon());
    im.is_intersects() && !im.is_touches()
}
