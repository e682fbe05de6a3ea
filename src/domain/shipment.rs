//! Per-shipment tracking state consumed by the dashboard views

use crate::domain::geo::{initial_bearing_deg, GeoPoint};
use crate::domain::progress::{ProgressMode, RouteProgress};
use crate::domain::route::{Route, RouteKind, DEFAULT_REGIONAL_WAYPOINTS};
use crate::error::{Result, TrackingError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Display status derived from progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Booked,
    InTransit,
    Delivered,
}

impl ShipmentStatus {
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction <= 0.0 {
            ShipmentStatus::Booked
        } else if fraction >= 1.0 {
            ShipmentStatus::Delivered
        } else {
            ShipmentStatus::InTransit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Booked => "booked",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShipmentStatus::Booked => "Booked",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::Delivered => "Delivered",
        }
    }
}

/// Scheduled departure and arrival of a voyage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoyageWindow {
    pub departed_at: DateTime<Utc>,
    pub eta: DateTime<Utc>,
}

impl VoyageWindow {
    pub fn new(departed_at: DateTime<Utc>, eta: DateTime<Utc>) -> Result<Self> {
        if eta <= departed_at {
            return Err(TrackingError::InvalidTimeWindow);
        }
        Ok(Self { departed_at, eta })
    }

    /// Fraction of the window elapsed at `now`, clamped to [0, 1]
    pub fn progress_at(&self, now: DateTime<Utc>) -> f64 {
        progress_between(self.departed_at, self.eta, now)
    }

    pub fn duration_hours(&self) -> f64 {
        (self.eta - self.departed_at).num_seconds() as f64 / 3600.0
    }
}

/// Elapsed share of `[departed_at, eta]` at `now`, clamped to [0, 1].
/// An empty or inverted window counts as complete once `now` reaches `eta`.
pub fn progress_between(departed_at: DateTime<Utc>, eta: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let total = (eta - departed_at).num_milliseconds();
    if total <= 0 {
        return if now >= eta { 1.0 } else { 0.0 };
    }
    let elapsed = (now - departed_at).num_milliseconds();
    (elapsed as f64 / total as f64).clamp(0.0, 1.0)
}

/// Vessel popup data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselInfo {
    /// Average speed over the voyage window, when one is known
    pub speed_knots: Option<f64>,
    /// Heading toward the next waypoint; None once arrived
    pub bearing_deg: Option<f64>,
    /// Free-form weather note, display only
    pub weather: Option<String>,
}

/// Inputs that shape a tracking computation besides the endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOptions {
    pub progress_mode: ProgressMode,
    pub regional_waypoints: usize,
    pub window: Option<VoyageWindow>,
    pub weather: Option<String>,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            progress_mode: ProgressMode::Index,
            regional_waypoints: DEFAULT_REGIONAL_WAYPOINTS,
            window: None,
            weather: None,
        }
    }
}

/// Everything a tracking view needs to render one shipment
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentTrackingState {
    pub view_id: Uuid,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub route_kind: RouteKind,
    pub progress_mode: ProgressMode,
    pub route: Route,
    pub progress: RouteProgress,
    pub vessel: VesselInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<VoyageWindow>,
    pub computed_at: DateTime<Utc>,
}

impl ShipmentTrackingState {
    /// Validate inputs, synthesize the route and place the vessel.
    ///
    /// Fails on out-of-range coordinates, on an origin equal to the
    /// destination and on a fraction outside [0, 1].
    ///
    /// # Example
    ///
    /// ```
    /// use freight_tracker::domain::geo::GeoPoint;
    /// use freight_tracker::domain::shipment::{ShipmentTrackingState, TrackingOptions};
    ///
    /// let shanghai = GeoPoint::new(121.4737, 31.2304).unwrap();
    /// let los_angeles = GeoPoint::new(-118.2437, 34.0522).unwrap();
    /// let state = ShipmentTrackingState::build(
    ///     "MSKU1234567",
    ///     shanghai,
    ///     los_angeles,
    ///     0.6,
    ///     &TrackingOptions::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(state.route.len(), 10);
    /// assert_eq!(state.status.label(), "In Transit");
    /// ```
    pub fn build(
        tracking_number: &str,
        origin: GeoPoint,
        destination: GeoPoint,
        fraction: f64,
        options: &TrackingOptions,
    ) -> Result<Self> {
        for point in [origin, destination] {
            if !point.is_valid() {
                return Err(TrackingError::InvalidCoordinate { lon: point.lon, lat: point.lat });
            }
        }
        if origin == destination {
            return Err(TrackingError::DegenerateRoute(1));
        }

        let route = Route::synthesize(origin, destination, options.regional_waypoints);
        let progress = RouteProgress::compute_with_mode(&route, fraction, options.progress_mode)?;
        let vessel = vessel_info(&route, &progress, options);

        Ok(Self {
            view_id: Uuid::now_v7(),
            tracking_number: tracking_number.to_string(),
            status: ShipmentStatus::from_fraction(progress.fraction),
            route_kind: route.kind(),
            progress_mode: options.progress_mode,
            route,
            progress,
            vessel,
            window: options.window,
            computed_at: Utc::now(),
        })
    }

    /// Move the vessel to a new progress fraction. The route is kept.
    ///
    /// On error the state is left untouched.
    pub fn recompute(&mut self, fraction: f64) -> Result<()> {
        let progress = RouteProgress::compute_with_mode(&self.route, fraction, self.progress_mode)?;
        self.vessel.bearing_deg = bearing(&progress);
        self.status = ShipmentStatus::from_fraction(progress.fraction);
        self.progress = progress;
        self.computed_at = Utc::now();
        Ok(())
    }

    pub fn origin(&self) -> GeoPoint {
        self.route.origin()
    }

    pub fn destination(&self) -> GeoPoint {
        self.route.destination()
    }

    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.window.map(|w| w.eta)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn bearing(progress: &RouteProgress) -> Option<f64> {
    if progress.current == progress.next_waypoint {
        None
    } else {
        Some(initial_bearing_deg(progress.current, progress.next_waypoint))
    }
}

fn vessel_info(route: &Route, progress: &RouteProgress, options: &TrackingOptions) -> VesselInfo {
    let speed_knots = options.window.and_then(|w| {
        let hours = w.duration_hours();
        (hours > 0.0).then(|| route.length_km() / KM_PER_NAUTICAL_MILE / hours)
    });

    VesselInfo { speed_knots, bearing_deg: bearing(progress), weather: options.weather.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SHANGHAI: GeoPoint = GeoPoint::from_degrees(121.4737, 31.2304);
    const LOS_ANGELES: GeoPoint = GeoPoint::from_degrees(-118.2437, 34.0522);

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_status_from_fraction() {
        assert_eq!(ShipmentStatus::from_fraction(0.0), ShipmentStatus::Booked);
        assert_eq!(ShipmentStatus::from_fraction(0.6), ShipmentStatus::InTransit);
        assert_eq!(ShipmentStatus::from_fraction(1.0), ShipmentStatus::Delivered);
        assert_eq!(ShipmentStatus::InTransit.label(), "In Transit");
        assert_eq!(ShipmentStatus::Delivered.as_str(), "delivered");
    }

    #[test]
    fn test_build_pacific_state() {
        let state = ShipmentTrackingState::build(
            "MSKU1234567",
            SHANGHAI,
            LOS_ANGELES,
            0.6,
            &TrackingOptions::default(),
        )
        .unwrap();

        assert_eq!(state.tracking_number, "MSKU1234567");
        assert_eq!(state.route_kind, RouteKind::TransPacificEastbound);
        assert_eq!(state.status, ShipmentStatus::InTransit);
        assert_eq!(state.progress.segment_index, 5);
        assert_eq!(state.origin(), SHANGHAI);
        assert_eq!(state.destination(), LOS_ANGELES);
        assert!(state.vessel.speed_knots.is_none());
        // heading roughly east
        let bearing = state.vessel.bearing_deg.unwrap();
        assert!((45.0..135.0).contains(&bearing), "bearing {bearing}");
    }

    #[test]
    fn test_build_rejects_invalid_coordinates() {
        let bad = GeoPoint::from_degrees(181.0, 0.0);
        let err = ShipmentTrackingState::build("X", bad, LOS_ANGELES, 0.5, &TrackingOptions::default())
            .unwrap_err();
        assert_eq!(err, TrackingError::InvalidCoordinate { lon: 181.0, lat: 0.0 });

        let nan = GeoPoint::from_degrees(0.0, f64::NAN);
        assert!(ShipmentTrackingState::build("X", SHANGHAI, nan, 0.5, &TrackingOptions::default())
            .is_err());
    }

    #[test]
    fn test_build_rejects_same_origin_and_destination() {
        let err = ShipmentTrackingState::build(
            "X",
            SHANGHAI,
            SHANGHAI,
            0.5,
            &TrackingOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, TrackingError::DegenerateRoute(1));
    }

    #[test]
    fn test_build_rejects_invalid_progress() {
        let err = ShipmentTrackingState::build(
            "X",
            SHANGHAI,
            LOS_ANGELES,
            1.5,
            &TrackingOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, TrackingError::InvalidProgress(1.5));
    }

    #[test]
    fn test_recompute_keeps_route() {
        let mut state = ShipmentTrackingState::build(
            "X",
            SHANGHAI,
            LOS_ANGELES,
            0.0,
            &TrackingOptions::default(),
        )
        .unwrap();
        assert_eq!(state.status, ShipmentStatus::Booked);
        let route = state.route.clone();

        state.recompute(1.0).unwrap();
        assert_eq!(state.route, route);
        assert_eq!(state.status, ShipmentStatus::Delivered);
        assert_eq!(state.progress.current, LOS_ANGELES);
        assert!(state.vessel.bearing_deg.is_none());

        assert!(state.recompute(-1.0).is_err());
        assert_eq!(state.status, ShipmentStatus::Delivered);
    }

    #[test]
    fn test_voyage_window_progress() {
        let window = VoyageWindow::new(utc(2026, 10, 1, 0), utc(2026, 10, 11, 0)).unwrap();
        assert_eq!(window.progress_at(utc(2026, 9, 30, 0)), 0.0);
        assert!((window.progress_at(utc(2026, 10, 7, 0)) - 0.6).abs() < 1e-9);
        assert_eq!(window.progress_at(utc(2026, 10, 20, 0)), 1.0);
        assert_eq!(window.duration_hours(), 240.0);

        assert_eq!(
            VoyageWindow::new(utc(2026, 10, 2, 0), utc(2026, 10, 1, 0)),
            Err(TrackingError::InvalidTimeWindow)
        );
    }

    #[test]
    fn test_progress_between_empty_window() {
        let t = utc(2026, 10, 1, 0);
        assert_eq!(progress_between(t, t, utc(2026, 9, 1, 0)), 0.0);
        assert_eq!(progress_between(t, t, t), 1.0);
    }

    #[test]
    fn test_speed_from_window() {
        let window = VoyageWindow::new(utc(2026, 10, 1, 0), utc(2026, 10, 15, 0)).unwrap();
        let options = TrackingOptions {
            window: Some(window),
            weather: Some("Clear, 12kt NW".to_string()),
            ..TrackingOptions::default()
        };
        let state =
            ShipmentTrackingState::build("X", SHANGHAI, LOS_ANGELES, 0.5, &options).unwrap();

        let speed = state.vessel.speed_knots.unwrap();
        // ~10,800 km over 14 days is ~17 knots
        assert!((15.0..20.0).contains(&speed), "speed {speed}");
        assert_eq!(state.vessel.weather.as_deref(), Some("Clear, 12kt NW"));
        assert_eq!(state.eta(), Some(utc(2026, 10, 15, 0)));
    }

    #[test]
    fn test_to_json() {
        let state = ShipmentTrackingState::build(
            "MSKU1234567",
            SHANGHAI,
            LOS_ANGELES,
            0.6,
            &TrackingOptions::default(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(json["tracking_number"], "MSKU1234567");
        assert_eq!(json["status"], "in_transit");
        assert_eq!(json["route_kind"], "trans_pacific_eastbound");
        assert_eq!(json["progress_mode"], "index");
        assert_eq!(json["route"]["waypoints"].as_array().unwrap().len(), 10);
        assert_eq!(json["progress"]["segment_index"], 5);
        assert!(json.get("window").is_none());
    }
}
