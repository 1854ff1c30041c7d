//! Tile URL rendering.

use super::TileCoordinate;

/// Substitutes `{x}`, `{y}` and `{z}` in `template` with the tile's values.
///
/// Every occurrence is replaced; no other placeholder is recognised. The
/// template is expected to be validated beforehand
/// (see [`crate::config::validate_template`]).
pub fn build_url(template: &str, tile: &TileCoordinate) -> String {
    template
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{z}", &tile.z.to_string())
}
