//! End-to-end tracking scenarios through the public API

use freight_tracker::domain::geo::{haversine_km, normalize_longitude, GeoPoint};
use freight_tracker::domain::ports::PortCatalog;
use freight_tracker::domain::route::{waypoints, Route, RouteKind, DEFAULT_REGIONAL_WAYPOINTS};
use freight_tracker::domain::shipment::{ShipmentStatus, TrackingOptions};
use freight_tracker::error::TrackingError;
use freight_tracker::infra::Metrics;
use freight_tracker::io::Egress;
use freight_tracker::services::TrackingBoard;
use std::sync::Arc;
use tempfile::tempdir;

fn port(name: &str) -> GeoPoint {
    PortCatalog::default().resolve(name).unwrap()
}

#[test]
fn test_shanghai_to_los_angeles_at_sixty_percent() {
    let board = TrackingBoard::new();
    let state = board
        .mount(
            "MSKU1234567",
            port("Shanghai"),
            port("Los Angeles"),
            0.6,
            &TrackingOptions::default(),
        )
        .unwrap();

    assert_eq!(state.route_kind, RouteKind::TransPacificEastbound);
    assert_eq!(state.route.len(), 10);
    assert_eq!(state.route.origin(), GeoPoint::from_degrees(121.4737, 31.2304));
    assert_eq!(state.route.destination(), GeoPoint::from_degrees(-118.2437, 34.0522));
    assert_eq!(state.progress.segment_index, 5);
    assert_eq!(state.status, ShipmentStatus::InTransit);
}

#[test]
fn test_rotterdam_to_new_york_uses_reversed_atlantic_template() {
    let rotterdam = port("Rotterdam");
    let new_york = port("New York");

    let westbound = Route::synthesize(rotterdam, new_york, DEFAULT_REGIONAL_WAYPOINTS);
    assert_eq!(westbound.kind(), RouteKind::TransAtlanticWestbound);
    assert_eq!(westbound.len(), 6);
    assert_eq!(westbound.origin(), rotterdam);
    assert_eq!(westbound.destination(), new_york);

    let eastbound = waypoints(RouteKind::TransAtlanticEastbound, new_york, rotterdam, 6);
    let mut reversed_interior: Vec<_> = eastbound.waypoints()[1..5].to_vec();
    reversed_interior.reverse();
    assert_eq!(&westbound.waypoints()[1..5], reversed_interior.as_slice());
}

#[test]
fn test_tokyo_to_seattle_is_trans_pacific() {
    let route = Route::synthesize(port("Tokyo"), port("Seattle"), DEFAULT_REGIONAL_WAYPOINTS);
    assert!(route.kind().is_trans_pacific());
}

#[test]
fn test_distance_properties() {
    let a = port("Shanghai");
    let b = port("Rotterdam");
    assert_eq!(haversine_km(a, a), 0.0);
    assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    for lon in [-180.0, -42.5, 0.0, 99.9, 180.0] {
        assert_eq!(normalize_longitude(lon), lon);
    }
}

#[test]
fn test_synthesis_is_deterministic() {
    let origin = port("Busan");
    let destination = port("Vancouver");
    let first = Route::synthesize(origin, destination, DEFAULT_REGIONAL_WAYPOINTS);
    let second = Route::synthesize(origin, destination, DEFAULT_REGIONAL_WAYPOINTS);
    assert_eq!(first, second);
}

#[test]
fn test_progress_lifecycle_on_board() {
    let board = TrackingBoard::new();
    let options = TrackingOptions::default();
    let start = board.mount("A", port("Hamburg"), port("Rotterdam"), 0.0, &options).unwrap();
    assert_eq!(start.route_kind, RouteKind::Regional);
    assert_eq!(start.progress.current, port("Hamburg"));
    assert_eq!(start.status, ShipmentStatus::Booked);

    let mut last_gap = f64::MAX;
    for p in [0.5, 0.9, 0.99] {
        let state = board.update_progress("A", p).unwrap().unwrap();
        let gap = haversine_km(state.progress.current, port("Rotterdam"));
        assert!(gap < last_gap);
        last_gap = gap;
    }

    let done = board.update_progress("A", 1.0).unwrap().unwrap();
    assert_eq!(done.progress.current, port("Rotterdam"));
    assert_eq!(done.status, ShipmentStatus::Delivered);

    assert!(board.unmount("A"));
    assert!(board.get("A").is_none());
}

#[test]
fn test_invalid_inputs_are_rejected_and_counted() {
    let metrics = Arc::new(Metrics::new());
    let board = TrackingBoard::with_metrics(metrics.clone());
    let options = TrackingOptions::default();

    let err = board
        .mount("A", GeoPoint::from_degrees(-181.0, 0.0), port("Santos"), 0.5, &options)
        .unwrap_err();
    assert_eq!(err, TrackingError::InvalidCoordinate { lon: -181.0, lat: 0.0 });

    let err = board.mount("A", port("Savannah"), port("Santos"), 2.0, &options).unwrap_err();
    assert_eq!(err, TrackingError::InvalidProgress(2.0));

    let err = board.mount("A", port("Busan"), port("Busan"), 0.5, &options).unwrap_err();
    assert_eq!(err, TrackingError::DegenerateRoute(1));

    assert!(board.is_empty());
    assert_eq!(metrics.invalid_inputs_total(), 3);
}

#[test]
fn test_board_snapshots_flow_to_egress() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("tracking.jsonl");
    let metrics = Arc::new(Metrics::new());
    let board = TrackingBoard::with_metrics(metrics.clone());
    let egress = Egress::new(file_path.to_str().unwrap()).with_metrics(metrics.clone());
    let options = TrackingOptions::default();

    board.mount("B", port("Tokyo"), port("Seattle"), 0.3, &options).unwrap();
    board.mount("A", port("Rotterdam"), port("New York"), 0.7, &options).unwrap();

    assert_eq!(egress.write_states(&board.snapshot()), 2);

    let content = std::fs::read_to_string(&file_path).unwrap();
    let rows: Vec<serde_json::Value> =
        content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(rows[0]["tracking_number"], "A");
    assert_eq!(rows[0]["route_kind"], "trans_atlantic_westbound");
    assert_eq!(rows[1]["route_kind"], "trans_pacific_eastbound");

    let summary = metrics.report();
    assert_eq!(summary.active_shipments, 2);
    assert_eq!(summary.egress_written_total, 2);
    assert_eq!(summary.routes_total(), 2);
}
