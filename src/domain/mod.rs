//! Domain models - route synthesis and shipment tracking
//!
//! This module contains the pure computation used throughout the system:
//! - `geo` - Coordinates, great-circle distance, longitude normalization
//! - `route` - Route classification and waypoint templates
//! - `progress` - Vessel position along a route
//! - `ports` - Named port catalog
//! - `shipment` - Per-shipment tracking state

pub mod geo;
pub mod ports;
pub mod progress;
pub mod route;
pub mod shipment;

// Re-export commonly used types at module level
pub use geo::GeoPoint;
pub use route::{Route, RouteKind};
pub use shipment::{ShipmentStatus, ShipmentTrackingState, TrackingOptions};
