//! Vessel position along a synthesized route

use crate::domain::geo::{haversine_km, path_length_km, GeoPoint};
use crate::domain::route::Route;
use crate::error::{Result, TrackingError};
use serde::{Deserialize, Serialize};

/// How a progress fraction maps onto the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Every segment gets an equal share of the fraction regardless of length.
    /// Visual speed is uneven across segments of different length.
    #[default]
    Index,
    /// The fraction is a share of total polyline length
    Distance,
}

impl ProgressMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressMode::Index => "index",
            ProgressMode::Distance => "distance",
        }
    }
}

/// Derived position of a shipment on its route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProgress {
    /// Progress fraction in [0, 1]
    pub fraction: f64,
    /// Index of the waypoint the current segment starts at
    pub segment_index: usize,
    /// Position within the current segment in [0, 1]
    pub segment_fraction: f64,
    pub current: GeoPoint,
    /// Waypoint the vessel is heading to
    pub next_waypoint: GeoPoint,
    /// Waypoints passed so far, ending at `current` when mid-segment
    pub completed: Vec<GeoPoint>,
    pub traveled_km: f64,
    pub remaining_km: f64,
    pub total_km: f64,
}

/// Reject fractions outside [0, 1] (including NaN)
pub fn validate_fraction(fraction: f64) -> Result<f64> {
    if fraction.is_finite() && (0.0..=1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(TrackingError::InvalidProgress(fraction))
    }
}

impl RouteProgress {
    /// Interpolate in waypoint-index space
    pub fn compute(route: &Route, fraction: f64) -> Result<Self> {
        Self::compute_with_mode(route, fraction, ProgressMode::Index)
    }

    pub fn compute_with_mode(route: &Route, fraction: f64, mode: ProgressMode) -> Result<Self> {
        let fraction = validate_fraction(fraction)?;
        let waypoints = route.waypoints();

        let (segment_index, segment_fraction) = match mode {
            ProgressMode::Index => locate_by_index(route.segment_count(), fraction),
            ProgressMode::Distance => locate_by_distance(waypoints, fraction)
                .unwrap_or_else(|| locate_by_index(route.segment_count(), fraction)),
        };

        let start = waypoints[segment_index];
        let next_waypoint = waypoints[segment_index + 1];
        let current = start.lerp(next_waypoint, segment_fraction);

        let mut completed = waypoints[..=segment_index].to_vec();
        if segment_fraction > 0.0 {
            completed.push(current);
        }

        let traveled_km = path_length_km(&completed);
        let remaining_km =
            haversine_km(current, next_waypoint) + path_length_km(&waypoints[segment_index + 1..]);

        Ok(Self {
            fraction,
            segment_index,
            segment_fraction,
            current,
            next_waypoint,
            completed,
            traveled_km,
            remaining_km,
            total_km: route.length_km(),
        })
    }

    /// Progress as a whole percentage for display
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.fraction >= 1.0
    }
}

/// Equal-weight segments. The index is clamped to the last segment so that
/// fraction 1.0 lands exactly on the destination.
fn locate_by_index(segments: usize, fraction: f64) -> (usize, f64) {
    let position = fraction * segments as f64;
    let index = (position.floor() as usize).min(segments - 1);
    (index, (position - index as f64).clamp(0.0, 1.0))
}

/// Arc-length weighted segments. None when the route has zero length.
fn locate_by_distance(waypoints: &[GeoPoint], fraction: f64) -> Option<(usize, f64)> {
    let lengths: Vec<f64> = waypoints.windows(2).map(|w| haversine_km(w[0], w[1])).collect();
    let total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let target = fraction * total;
    let mut covered = 0.0;
    for (i, &len) in lengths.iter().enumerate() {
        if covered + len >= target && len > 0.0 {
            return Some((i, ((target - covered) / len).clamp(0.0, 1.0)));
        }
        covered += len;
    }
    // rounding left the target just past the end
    Some((lengths.len() - 1, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::{RouteKind, DEFAULT_REGIONAL_WAYPOINTS};

    const SHANGHAI: GeoPoint = GeoPoint::from_degrees(121.4737, 31.2304);
    const LOS_ANGELES: GeoPoint = GeoPoint::from_degrees(-118.2437, 34.0522);

    fn pacific() -> Route {
        Route::synthesize(SHANGHAI, LOS_ANGELES, DEFAULT_REGIONAL_WAYPOINTS)
    }

    #[test]
    fn test_start_of_route() {
        let route = pacific();
        let progress = RouteProgress::compute(&route, 0.0).unwrap();
        assert_eq!(progress.current, SHANGHAI);
        assert_eq!(progress.segment_index, 0);
        assert_eq!(progress.completed, vec![SHANGHAI]);
        assert_eq!(progress.traveled_km, 0.0);
        assert!((progress.remaining_km - progress.total_km).abs() < 1e-6);
    }

    #[test]
    fn test_end_of_route_is_destination() {
        let route = pacific();
        let progress = RouteProgress::compute(&route, 1.0).unwrap();
        assert_eq!(progress.current, LOS_ANGELES);
        assert_eq!(progress.segment_index, 8);
        assert_eq!(progress.remaining_km, 0.0);
        assert_eq!(progress.completed.len(), route.len());
        assert!(progress.is_complete());
    }

    #[test]
    fn test_approaches_destination() {
        let route = pacific();
        let mut last = f64::MAX;
        for p in [0.9, 0.99, 0.999, 0.9999] {
            let progress = RouteProgress::compute(&route, p).unwrap();
            let gap = haversine_km(progress.current, LOS_ANGELES);
            assert!(gap < last);
            last = gap;
        }
        assert!(last < 5.0);
    }

    #[test]
    fn test_shanghai_los_angeles_sixty_percent() {
        let route = pacific();
        let progress = RouteProgress::compute(&route, 0.6).unwrap();

        assert_eq!(route.kind(), RouteKind::TransPacificEastbound);
        assert_eq!(progress.segment_index, 5);
        assert!((progress.segment_fraction - 0.4).abs() < 1e-9);

        let w = route.waypoints();
        assert_eq!(progress.next_waypoint, w[6]);
        // between (-175, 42) and (-160, 41), heading east
        assert!((progress.current.lon - (-169.0)).abs() < 1e-6);
        assert!((progress.current.lat - 41.6).abs() < 1e-6);
        assert_eq!(progress.completed.len(), 7);
        assert_eq!(progress.completed[..6], w[..6]);
        assert_eq!(progress.percent(), 60);
    }

    #[test]
    fn test_distances_add_up() {
        let route = pacific();
        for p in [0.1, 0.33, 0.6, 0.85] {
            let progress = RouteProgress::compute(&route, p).unwrap();
            let sum = progress.traveled_km + progress.remaining_km;
            assert!((sum - progress.total_km).abs() / progress.total_km < 0.01, "p={p}");
        }
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let route = pacific();
        for p in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                RouteProgress::compute(&route, p),
                Err(TrackingError::InvalidProgress(_))
            ));
        }
    }

    #[test]
    fn test_distance_mode_is_uniform() {
        let route = pacific();
        let progress =
            RouteProgress::compute_with_mode(&route, 0.5, ProgressMode::Distance).unwrap();
        let half = progress.total_km / 2.0;
        assert!((progress.traveled_km - half).abs() / progress.total_km < 0.01);
    }

    #[test]
    fn test_distance_mode_endpoints() {
        let route = pacific();
        let start = RouteProgress::compute_with_mode(&route, 0.0, ProgressMode::Distance).unwrap();
        let end = RouteProgress::compute_with_mode(&route, 1.0, ProgressMode::Distance).unwrap();
        assert_eq!(start.current, SHANGHAI);
        assert_eq!(end.current, LOS_ANGELES);
    }

    #[test]
    fn test_zero_length_route() {
        let route = Route::new(RouteKind::Regional, vec![SHANGHAI, SHANGHAI]).unwrap();
        let progress =
            RouteProgress::compute_with_mode(&route, 0.5, ProgressMode::Distance).unwrap();
        assert_eq!(progress.current, SHANGHAI);
        assert_eq!(progress.total_km, 0.0);
    }

    #[test]
    fn test_two_point_route() {
        let a = GeoPoint::from_degrees(0.0, 0.0);
        let b = GeoPoint::from_degrees(10.0, 0.0);
        let route = Route::new(RouteKind::Regional, vec![a, b]).unwrap();
        let progress = RouteProgress::compute(&route, 0.25).unwrap();
        assert!((progress.current.lon - 2.5).abs() < 1e-9);
        assert_eq!(progress.completed.len(), 2);
    }
}
