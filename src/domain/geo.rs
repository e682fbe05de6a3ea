//! Geographic primitives: points, longitude wrapping, great-circle math

use crate::error::{Result, TrackingError};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Mean Earth radius used for haversine distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A (longitude, latitude) pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Create a validated point.
    ///
    /// Rejects non-finite values, |lon| > 180 and |lat| > 90. Route synthesis
    /// and interpolation assume points that pass this check.
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        let point = Self { lon, lat };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(TrackingError::InvalidCoordinate { lon, lat })
        }
    }

    /// Unchecked constructor for compile-time waypoint tables
    pub const fn from_degrees(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.lon.abs() <= 180.0
            && self.lat.abs() <= 90.0
    }

    /// Great-circle distance to `other` in kilometers
    #[inline]
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        haversine_km(self, other)
    }

    /// Linear interpolation toward `to`, taking the short way around in longitude.
    ///
    /// `t` is expected in [0, 1]; the endpoints are returned exactly.
    pub fn lerp(self, to: GeoPoint, t: f64) -> GeoPoint {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return to;
        }
        let d_lon = longitude_delta(self.lon, to.lon);
        GeoPoint {
            lon: normalize_longitude(self.lon + d_lon * t),
            lat: self.lat + (to.lat - self.lat) * t,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lon, self.lat)
    }
}

/// Map a finite longitude into [-180, 180]. Values already in range are untouched.
#[inline]
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed shortest longitude step from `from` to `to`, in (-180, 180]
#[inline]
pub fn longitude_delta(from: f64, to: f64) -> f64 {
    let d = to - from;
    if d > 180.0 {
        d - 360.0
    } else if d <= -180.0 {
        d + 360.0
    } else {
        d
    }
}

/// Haversine great-circle distance in kilometers
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();

    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;
    // clamp guards asin against rounding just above 1.0 for antipodal points
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * central_angle
}

/// Initial great-circle bearing from `a` to `b`, degrees clockwise from north in [0, 360)
pub fn initial_bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Total length of a polyline in kilometers
pub fn path_length_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Split the short-way segment `a -> b` where it crosses the ±180° meridian.
///
/// Returns one piece when there is no crossing, otherwise two pieces that end
/// and start on opposite map edges at the same latitude.
pub fn split_at_antimeridian(a: GeoPoint, b: GeoPoint) -> SmallVec<[(GeoPoint, GeoPoint); 2]> {
    let d_lon = longitude_delta(a.lon, b.lon);
    let unwrapped = a.lon + d_lon;
    if (-180.0..=180.0).contains(&unwrapped) {
        return smallvec![(a, b)];
    }

    let edge = if unwrapped > 180.0 { 180.0 } else { -180.0 };
    let t = (edge - a.lon) / d_lon;
    let lat = a.lat + (b.lat - a.lat) * t;
    smallvec![
        (a, GeoPoint { lon: edge, lat }),
        (GeoPoint { lon: -edge, lat }, b),
    ]
}
