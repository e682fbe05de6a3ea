//! Maritime route synthesis
//!
//! Routes are approximated from hand-placed ocean waypoints, not computed as
//! geodesics. Classification picks a template by which ocean the voyage
//! crosses; anything else falls back to straight interpolation.

use crate::domain::geo::{longitude_delta, normalize_longitude, path_length_km, GeoPoint};
use crate::error::{Result, TrackingError};
use serde::Serialize;
use smallvec::SmallVec;

/// Default number of waypoints for regional routes (endpoints included)
pub const DEFAULT_REGIONAL_WAYPOINTS: usize = 6;

/// Longitude magnitude beyond which a port is considered Pacific-rim
const PACIFIC_RIM_LON: f64 = 100.0;

/// Longitude spread that marks an ocean crossing outside the Pacific
const TRANS_ATLANTIC_MIN_SPREAD: f64 = 60.0;

/// Asia to the Americas, north Pacific arc, heading east across the date line
const TRANS_PACIFIC_EASTBOUND: [GeoPoint; 8] = [
    GeoPoint::from_degrees(130.0, 31.0),
    GeoPoint::from_degrees(142.0, 34.0),
    GeoPoint::from_degrees(155.0, 38.0),
    GeoPoint::from_degrees(170.0, 41.0),
    GeoPoint::from_degrees(-175.0, 42.0),
    GeoPoint::from_degrees(-160.0, 41.0),
    GeoPoint::from_degrees(-145.0, 39.0),
    GeoPoint::from_degrees(-130.0, 36.0),
];

/// Americas to Asia, a flatter southern track heading west across the date line
const TRANS_PACIFIC_WESTBOUND: [GeoPoint; 7] = [
    GeoPoint::from_degrees(-128.0, 33.0),
    GeoPoint::from_degrees(-145.0, 32.0),
    GeoPoint::from_degrees(-165.0, 33.0),
    GeoPoint::from_degrees(178.0, 34.0),
    GeoPoint::from_degrees(162.0, 33.0),
    GeoPoint::from_degrees(148.0, 32.0),
    GeoPoint::from_degrees(135.0, 31.0),
];

/// Mid-Atlantic track ordered west to east. Westbound voyages walk it backwards.
const TRANS_ATLANTIC_EASTBOUND: [GeoPoint; 4] = [
    GeoPoint::from_degrees(-60.0, 40.5),
    GeoPoint::from_degrees(-40.0, 44.0),
    GeoPoint::from_degrees(-20.0, 48.0),
    GeoPoint::from_degrees(-5.0, 49.5),
];

/// Route shape category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    TransPacificEastbound,
    TransPacificWestbound,
    TransAtlanticEastbound,
    TransAtlanticWestbound,
    Regional,
}

impl RouteKind {
    pub const ALL: [RouteKind; 5] = [
        RouteKind::TransPacificEastbound,
        RouteKind::TransPacificWestbound,
        RouteKind::TransAtlanticEastbound,
        RouteKind::TransAtlanticWestbound,
        RouteKind::Regional,
    ];

    /// Classify an origin/destination pair.
    ///
    /// Rules are checked in order:
    /// 1. Trans-Pacific when one end is west of -100° and the other east of 100°
    /// 2. Trans-Atlantic when the raw longitude spread exceeds 60°
    /// 3. Regional otherwise
    ///
    /// Rule 2 only looks at longitudes, so long non-Atlantic legs such as
    /// Shanghai to Rotterdam are classified Trans-Atlantic too. None of the
    /// mid-Atlantic track lies between those ports, so `waypoints` re-spaces
    /// it along the leg and the result is a straight sweep.
    pub fn classify(origin: GeoPoint, destination: GeoPoint) -> Self {
        if origin.lon > PACIFIC_RIM_LON && destination.lon < -PACIFIC_RIM_LON {
            RouteKind::TransPacificEastbound
        } else if origin.lon < -PACIFIC_RIM_LON && destination.lon > PACIFIC_RIM_LON {
            RouteKind::TransPacificWestbound
        } else if (origin.lon - destination.lon).abs() > TRANS_ATLANTIC_MIN_SPREAD {
            if origin.lon < destination.lon {
                RouteKind::TransAtlanticEastbound
            } else {
                RouteKind::TransAtlanticWestbound
            }
        } else {
            RouteKind::Regional
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::TransPacificEastbound => "trans_pacific_eastbound",
            RouteKind::TransPacificWestbound => "trans_pacific_westbound",
            RouteKind::TransAtlanticEastbound => "trans_atlantic_eastbound",
            RouteKind::TransAtlanticWestbound => "trans_atlantic_westbound",
            RouteKind::Regional => "regional",
        }
    }

    /// Human-readable label for display panels
    pub fn label(&self) -> &'static str {
        match self {
            RouteKind::TransPacificEastbound => "Trans-Pacific (eastbound)",
            RouteKind::TransPacificWestbound => "Trans-Pacific (westbound)",
            RouteKind::TransAtlanticEastbound => "Trans-Atlantic (eastbound)",
            RouteKind::TransAtlanticWestbound => "Trans-Atlantic (westbound)",
            RouteKind::Regional => "Regional",
        }
    }

    pub fn is_trans_pacific(&self) -> bool {
        matches!(self, RouteKind::TransPacificEastbound | RouteKind::TransPacificWestbound)
    }

    pub fn is_trans_atlantic(&self) -> bool {
        matches!(self, RouteKind::TransAtlanticEastbound | RouteKind::TransAtlanticWestbound)
    }
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waypoint storage; the largest template is 10 points
pub type Waypoints = SmallVec<[GeoPoint; 10]>;

/// Ordered waypoints from origin to destination (at least 2)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    kind: RouteKind,
    waypoints: Waypoints,
}

impl Route {
    /// Build a route from explicit waypoints
    pub fn new(kind: RouteKind, waypoints: impl Into<Waypoints>) -> Result<Self> {
        let waypoints = waypoints.into();
        if waypoints.len() < 2 {
            return Err(TrackingError::DegenerateRoute(waypoints.len()));
        }
        Ok(Self { kind, waypoints })
    }

    /// Classify and synthesize the route between two ports
    pub fn synthesize(origin: GeoPoint, destination: GeoPoint, regional_points: usize) -> Self {
        let kind = RouteKind::classify(origin, destination);
        waypoints(kind, origin, destination, regional_points)
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of segments between consecutive waypoints
    pub fn segment_count(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn origin(&self) -> GeoPoint {
        self.waypoints[0]
    }

    pub fn destination(&self) -> GeoPoint {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Full polyline length in kilometers
    pub fn length_km(&self) -> f64 {
        path_length_km(&self.waypoints)
    }

    /// Largest wrapped longitude step between consecutive waypoints
    pub fn max_longitude_step(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|w| longitude_delta(w[0].lon, w[1].lon).abs())
            .fold(0.0, f64::max)
    }
}

/// Produce the waypoint sequence for a route kind.
///
/// The result always starts exactly at `origin` and ends exactly at
/// `destination`. `regional_points` only affects `RouteKind::Regional` and
/// is raised to 2 if smaller.
pub fn waypoints(
    kind: RouteKind,
    origin: GeoPoint,
    destination: GeoPoint,
    regional_points: usize,
) -> Route {
    let mut points = Waypoints::new();
    points.push(origin);

    match kind {
        RouteKind::TransPacificEastbound => points.extend(anchor_template(
            origin,
            destination,
            &TRANS_PACIFIC_EASTBOUND,
            Heading::East,
        )),
        RouteKind::TransPacificWestbound => points.extend(anchor_template(
            origin,
            destination,
            &TRANS_PACIFIC_WESTBOUND,
            Heading::West,
        )),
        RouteKind::TransAtlanticEastbound => points.extend(anchor_template(
            origin,
            destination,
            &TRANS_ATLANTIC_EASTBOUND,
            Heading::East,
        )),
        RouteKind::TransAtlanticWestbound => {
            let track: SmallVec<[GeoPoint; 4]> =
                TRANS_ATLANTIC_EASTBOUND.iter().rev().copied().collect();
            points.extend(anchor_template(origin, destination, &track, Heading::West))
        }
        RouteKind::Regional => {
            points.extend(regional_interior(origin, destination, regional_points))
        }
    }

    points.push(destination);
    Route { kind, waypoints: points }
}

/// Direction of travel along an ocean template
#[derive(Debug, Clone, Copy)]
enum Heading {
    East,
    West,
}

impl Heading {
    /// Degrees travelled from `from` to `to` moving this way, in [0, 360)
    fn offset(self, from: f64, to: f64) -> f64 {
        match self {
            Heading::East => (to - from).rem_euclid(360.0),
            Heading::West => (from - to).rem_euclid(360.0),
        }
    }

    fn sign(self) -> f64 {
        match self {
            Heading::East => 1.0,
            Heading::West => -1.0,
        }
    }
}

/// Fit a template between two ports.
///
/// Template points that lie behind the origin or past the destination along
/// `heading` are dropped and the same number of points is re-spaced evenly
/// over the uncovered stretch, so the point count stays fixed and every step
/// moves with `heading`. Templates span well under 180°, so the points that
/// fall inside the leg form one contiguous run.
fn anchor_template(
    origin: GeoPoint,
    destination: GeoPoint,
    template: &[GeoPoint],
    heading: Heading,
) -> Waypoints {
    let span = heading.offset(origin.lon, destination.lon);
    let inside = |p: &GeoPoint| {
        let offset = heading.offset(origin.lon, p.lon);
        offset > 0.0 && offset < span
    };

    let first = template.iter().position(&inside);
    let last = template.iter().rposition(&inside);
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => return spaced_between(origin, destination, template.len(), heading).collect(),
    };

    let mut points = Waypoints::new();
    points.extend(spaced_between(origin, template[first], first, heading));
    points.extend_from_slice(&template[first..=last]);
    points.extend(spaced_between(template[last], destination, template.len() - 1 - last, heading));
    points
}

/// `count` points strictly between `from` and `to`, evenly spaced along `heading`
fn spaced_between(
    from: GeoPoint,
    to: GeoPoint,
    count: usize,
    heading: Heading,
) -> impl Iterator<Item = GeoPoint> {
    let d_lon = heading.sign() * heading.offset(from.lon, to.lon);
    let steps = (count + 1) as f64;
    (1..=count).map(move |i| {
        let t = i as f64 / steps;
        GeoPoint {
            lon: normalize_longitude(from.lon + d_lon * t),
            lat: from.lat + (to.lat - from.lat) * t,
        }
    })
}

/// Interior points of a straight regional route (endpoints excluded)
fn regional_interior(
    origin: GeoPoint,
    destination: GeoPoint,
    count: usize,
) -> impl Iterator<Item = GeoPoint> {
    let count = count.max(2);
    let segments = (count - 1) as f64;

    // Shift the destination by a full turn when the raw spread crosses the
    // antimeridian, then fold each interpolated longitude back into range.
    let raw_spread = destination.lon - origin.lon;
    let dest_lon = if raw_spread > 180.0 {
        destination.lon - 360.0
    } else if raw_spread < -180.0 {
        destination.lon + 360.0
    } else {
        destination.lon
    };

    (1..count - 1).map(move |i| {
        let t = i as f64 / segments;
        GeoPoint {
            lon: normalize_longitude(origin.lon + (dest_lon - origin.lon) * t),
            lat: origin.lat + (destination.lat - origin.lat) * t,
        }
    })
}
