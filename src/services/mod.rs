//! Services - tracking state management
//!
//! - `tracking` - Explicit store of mounted shipment tracking views

pub mod tracking;

pub use tracking::TrackingBoard;
