//! Slippy-map tile math.
//!
//! Download regions are aligned to a fixed grid of web-mercator tiles so that
//! repeated downloads of nearby areas reuse the same boundaries and overlap
//! bookkeeping can detect already-covered tiles.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::geo::{BoundingBox, LatLon};

/// Default zoom level of the quest download grid.
pub const DEFAULT_TILE_ZOOM: u32 = 14;

/// A single tile of the global grid at some zoom level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
}

/// An inclusive rectangle of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl TileRect {
    pub fn tile_count(&self) -> u64 {
        let w = u64::from(self.right - self.left) + 1;
        let h = u64::from(self.bottom - self.top) + 1;
        w * h
    }

    /// The geographic bounds covered by this rectangle of tiles.
    pub fn bounds(&self, zoom: u32) -> BoundingBox {
        BoundingBox::new(
            LatLon::new(tile_edge_lat(self.bottom + 1, zoom), tile_edge_lon(self.left, zoom)),
            LatLon::new(tile_edge_lat(self.top, zoom), tile_edge_lon(self.right + 1, zoom)),
        )
    }
}

/// The tile containing the given position.
pub fn tile_at(pos: LatLon, zoom: u32) -> Tile {
    Tile {
        x: tile_x(pos.longitude, zoom),
        y: tile_y(pos.latitude, zoom),
    }
}

/// The smallest rectangle of tiles enclosing the given bounding box.
pub fn enclosing_tiles(bbox: &BoundingBox, zoom: u32) -> TileRect {
    TileRect {
        left: tile_x(bbox.min.longitude, zoom),
        top: tile_y(bbox.max.latitude, zoom),
        right: tile_x(bbox.max.longitude, zoom),
        bottom: tile_y(bbox.min.latitude, zoom),
    }
}

fn tile_x(longitude: f64, zoom: u32) -> u32 {
    let n = f64::from(1u32 << zoom);
    let x = ((longitude + 180.0) / 360.0 * n).floor();
    clamp_index(x, zoom)
}

fn tile_y(latitude: f64, zoom: u32) -> u32 {
    let n = f64::from(1u32 << zoom);
    let lat = latitude.to_radians();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
    clamp_index(y, zoom)
}

/// Longitude of the western edge of tile column `x`.
fn tile_edge_lon(x: u32, zoom: u32) -> f64 {
    let n = f64::from(1u32 << zoom);
    f64::from(x) / n * 360.0 - 180.0
}

/// Latitude of the northern edge of tile row `y`.
fn tile_edge_lat(y: u32, zoom: u32) -> f64 {
    let n = f64::from(1u32 << zoom);
    let t = PI * (1.0 - 2.0 * f64::from(y) / n);
    t.sinh().atan().to_degrees()
}

fn clamp_index(value: f64, zoom: u32) -> u32 {
    let max = (1u32 << zoom) - 1;
    if value < 0.0 {
        0
    } else if value > f64::from(max) {
        max
    } else {
        value as u32
    }
}
