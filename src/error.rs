//! Error types for route synthesis and shipment tracking

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("invalid progress fraction: {0} (expected 0.0..=1.0)")]
    InvalidProgress(f64),

    #[error("route needs at least 2 distinct waypoints, got {0}")]
    DegenerateRoute(usize),

    #[error("unknown port: {0}")]
    UnknownPort(String),

    #[error("invalid voyage window: departure must precede ETA")]
    InvalidTimeWindow,
}

pub type Result<T> = std::result::Result<T, TrackingError>;
