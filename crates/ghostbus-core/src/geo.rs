//! Geographic math for ghost-vehicle detection

use serde::{Deserialize, Serialize};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic point with latitude and longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check if this point is a valid coordinate pair
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lon >= -180.0 && self.lon <= 180.0
    }

    /// Great-circle distance to another point using the Haversine formula.
    /// Returns distance in kilometers.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Perpendicular distance from this point to the segment `start`-`end`.
    ///
    /// The projection parameter is computed in a locally-flat system
    /// (degrees treated as planar), clamped to [0, 1], and the final
    /// distance to the closest point goes back through haversine. A
    /// zero-length segment degrades to point-to-point distance.
    /// Returns distance in kilometers.
    pub fn distance_to_segment(&self, start: &GeoPoint, end: &GeoPoint) -> f64 {
        let (px, py) = (self.lat.to_radians(), self.lon.to_radians());
        let (x1, y1) = (start.lat.to_radians(), start.lon.to_radians());
        let (x2, y2) = (end.lat.to_radians(), end.lon.to_radians());

        let dx = x2 - x1;
        let dy = y2 - y1;
        let len_sq = dx * dx + dy * dy;

        if len_sq == 0.0 {
            return self.distance_to(start);
        }

        let param = ((px - x1) * dx + (py - y1) * dy) / len_sq;
        let param = param.clamp(0.0, 1.0);

        let closest = GeoPoint::new(
            (x1 + param * dx).to_degrees(),
            (y1 + param * dy).to_degrees(),
        );

        self.distance_to(&closest)
    }
}

/// An ordered route shape segment (polyline of geo points)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Minimum distance from a point to any segment of this polyline,
    /// in kilometers. Returns `None` for an empty polyline.
    pub fn distance_to_point(&self, point: &GeoPoint) -> Option<f64> {
        match self.points.len() {
            0 => None,
            1 => Some(point.distance_to(&self.points[0])),
            _ => self
                .points
                .windows(2)
                .map(|w| point.distance_to_segment(&w[0], &w[1]))
                .min_by(|a, b| a.total_cmp(b)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
