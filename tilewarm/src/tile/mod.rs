//! Tile coordinates and work-list construction.
//!
//! Turns one or more region polygons and a list of zoom levels into the
//! ordered, deduplicated set of tiles to request, then slices that set into
//! one [`ZoomBatch`] per zoom level.
//!
//! # Ordering
//!
//! Tiles are sorted by `(z, x, y)`. Besides making the list reproducible from
//! run to run, this keeps every zoom level contiguous so batches can be cut
//! out of the list without another pass.

mod url;

pub use url::build_url;

use std::collections::HashSet;
use std::fmt;

use geo::Polygon;

use crate::coord::{CoverError, TileCover};

/// Address of a single tile in the `z/x/y` tiling scheme.
///
/// The derived ordering compares zoom first, then column, then row, which is
/// the work-list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    /// Zoom level
    pub z: u8,
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
}

impl TileCoordinate {
    /// Creates a tile coordinate from its `x`, `y`, `z` components.
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { z, x, y }
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> (u32, u32, u8) {
        (self.x, self.y, self.z)
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// All tiles of one zoom level together with their request URLs.
///
/// `tiles[i]` is requested through `urls[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomBatch {
    pub zoom: u8,
    pub tiles: Vec<TileCoordinate>,
    pub urls: Vec<String>,
}

impl ZoomBatch {
    /// Number of tiles in the batch.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if the batch holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Builds the ordered, deduplicated tile list covering `geometries` at every
/// level in `zoom_levels`.
///
/// An empty result means the region touches no tile; it is not an error.
///
/// # Errors
///
/// Propagates the first error raised by the covering function. A failing
/// cover means the work list cannot be determined at all.
pub fn build_tiles<C>(
    geometries: &[Polygon<f64>],
    zoom_levels: &[u8],
    cover: &C,
) -> Result<Vec<TileCoordinate>, CoverError>
where
    C: TileCover + ?Sized,
{
    let mut tiles = Vec::new();
    for &zoom in zoom_levels {
        for geometry in geometries {
            tiles.extend(cover.cover(geometry, zoom)?);
        }
    }

    Ok(sort_and_dedup(tiles))
}

/// Stable-sorts tiles by `(z, x, y)` and drops repeated coordinates,
/// keeping the first occurrence.
pub fn sort_and_dedup(mut tiles: Vec<TileCoordinate>) -> Vec<TileCoordinate> {
    tiles.sort();

    let mut seen = HashSet::with_capacity(tiles.len());
    tiles.retain(|tile| seen.insert(tile.key()));
    tiles
}

/// Splits a sorted tile list into per-zoom batches and renders their URLs.
///
/// Batches come out in ascending zoom order. The input must already be
/// sorted (see [`build_tiles`]); each run of equal zoom levels becomes one
/// batch.
pub fn group_by_zoom(tiles: &[TileCoordinate], template: &str) -> Vec<ZoomBatch> {
    let mut batches: Vec<ZoomBatch> = Vec::new();

    for tile in tiles {
        let url = build_url(template, tile);
        match batches.last_mut() {
            Some(batch) if batch.zoom == tile.z => {
                batch.tiles.push(*tile);
                batch.urls.push(url);
            }
            _ => batches.push(ZoomBatch {
                zoom: tile.z,
                tiles: vec![*tile],
                urls: vec![url],
            }),
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use proptest::prelude::*;

    /// Cover that returns a fixed tile list per zoom, regardless of geometry.
    struct FixedCover(Vec<TileCoordinate>);

    impl TileCover for FixedCover {
        fn cover(&self, _geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError> {
            Ok(self.0.iter().copied().filter(|t| t.z == zoom).collect())
        }
    }

    struct FailingCover;

    impl TileCover for FailingCover {
        fn cover(&self, _geometry: &Polygon<f64>, zoom: u8) -> Result<Vec<TileCoordinate>, CoverError> {
            Err(CoverError::InvalidZoom(zoom))
        }
    }

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn test_overlapping_geometries_yield_tile_once() {
        let cover = FixedCover(vec![TileCoordinate::new(1, 2, 3), TileCoordinate::new(1, 3, 3)]);
        let tiles = build_tiles(&[square(), square()], &[3], &cover).unwrap();

        assert_eq!(
            tiles,
            vec![TileCoordinate::new(1, 2, 3), TileCoordinate::new(1, 3, 3)]
        );
    }

    #[test]
    fn test_tiles_sorted_by_zoom_then_x_then_y() {
        let cover = FixedCover(vec![
            TileCoordinate::new(5, 1, 4),
            TileCoordinate::new(2, 9, 4),
            TileCoordinate::new(2, 1, 4),
            TileCoordinate::new(0, 0, 2),
        ]);
        let tiles = build_tiles(&[square()], &[4, 2], &cover).unwrap();

        assert_eq!(
            tiles,
            vec![
                TileCoordinate::new(0, 0, 2),
                TileCoordinate::new(2, 1, 4),
                TileCoordinate::new(2, 9, 4),
                TileCoordinate::new(5, 1, 4),
            ]
        );
    }

    #[test]
    fn test_empty_cover_is_not_an_error() {
        let cover = FixedCover(Vec::new());
        let tiles = build_tiles(&[square()], &[1, 2, 3], &cover).unwrap();
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_cover_failure_propagates() {
        let result = build_tiles(&[square()], &[7], &FailingCover);
        assert!(matches!(result, Err(CoverError::InvalidZoom(7))));
    }

    #[test]
    fn test_group_by_zoom_keeps_urls_aligned() {
        let tiles = vec![
            TileCoordinate::new(0, 0, 1),
            TileCoordinate::new(1, 0, 1),
            TileCoordinate::new(4, 5, 3),
        ];
        let batches = group_by_zoom(&tiles, "http://t/{z}/{x}/{y}");

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].zoom, 1);
        assert_eq!(batches[0].urls, vec!["http://t/1/0/0", "http://t/1/1/0"]);
        assert_eq!(batches[1].zoom, 3);
        assert_eq!(batches[1].tiles, vec![TileCoordinate::new(4, 5, 3)]);
        assert_eq!(batches[1].urls, vec!["http://t/3/4/5"]);
    }

    #[test]
    fn test_group_by_zoom_empty() {
        assert!(group_by_zoom(&[], "http://t/{z}/{x}/{y}").is_empty());
    }

    #[test]
    fn test_display_uses_identity_key_order() {
        assert_eq!(TileCoordinate::new(3, 4, 5).to_string(), "3,4,5");
    }

    fn arb_tile() -> impl Strategy<Value = TileCoordinate> {
        (0u32..8, 0u32..8, 0u8..4).prop_map(|(x, y, z)| TileCoordinate::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_sort_and_dedup_is_unique_and_sorted(tiles in prop::collection::vec(arb_tile(), 0..200)) {
            let result = sort_and_dedup(tiles.clone());

            let unique: HashSet<_> = tiles.iter().map(|t| t.key()).collect();
            prop_assert_eq!(result.len(), unique.len());
            prop_assert!(result.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn prop_build_is_deterministic(tiles in prop::collection::vec(arb_tile(), 0..100)) {
            let cover = FixedCover(tiles);
            let first = build_tiles(&[square(), square()], &[0, 1, 2, 3], &cover).unwrap();
            let second = build_tiles(&[square(), square()], &[0, 1, 2, 3], &cover).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
