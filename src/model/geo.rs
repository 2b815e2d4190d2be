//! Geographic primitives.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// An axis-aligned geographic rectangle.
///
/// `min` is the south-west corner, `max` the north-east corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: LatLon,
    pub max: LatLon,
}

impl BoundingBox {
    pub fn new(min: LatLon, max: LatLon) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, pos: LatLon) -> bool {
        pos.latitude >= self.min.latitude
            && pos.latitude <= self.max.latitude
            && pos.longitude >= self.min.longitude
            && pos.longitude <= self.max.longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_includes_edges() {
        let bbox = BoundingBox::new(LatLon::new(0.0, 0.0), LatLon::new(1.0, 2.0));
        assert!(bbox.contains(LatLon::new(0.0, 0.0)));
        assert!(bbox.contains(LatLon::new(1.0, 2.0)));
        assert!(bbox.contains(LatLon::new(0.5, 1.0)));
        assert!(!bbox.contains(LatLon::new(1.1, 1.0)));
        assert!(!bbox.contains(LatLon::new(0.5, -0.1)));
    }
}
