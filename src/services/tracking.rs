//! Tracking board: the explicit store of mounted shipment views
//!
//! A view mounts a shipment (state is computed), pushes progress updates
//! (state is recomputed) and unmounts it (state is dropped). Nothing is
//! persisted; the board is created at startup and can be cleared on demand.

use crate::domain::geo::GeoPoint;
use crate::domain::shipment::{ShipmentTrackingState, TrackingOptions};
use crate::error::{Result, TrackingError};
use crate::infra::metrics::Metrics;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Mounted shipment states keyed by tracking number
pub struct TrackingBoard {
    shipments: RwLock<FxHashMap<String, ShipmentTrackingState>>,
    metrics: Option<Arc<Metrics>>,
}

impl Default for TrackingBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingBoard {
    pub fn new() -> Self {
        Self { shipments: RwLock::new(FxHashMap::default()), metrics: None }
    }

    /// Create a board with metrics recording
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { shipments: RwLock::new(FxHashMap::default()), metrics: Some(metrics) }
    }

    /// Compute and store the tracking state for a shipment.
    ///
    /// Replaces any state already mounted under the same tracking number.
    /// Invalid coordinates, identical endpoints or bad progress are logged
    /// and returned without touching the board.
    pub fn mount(
        &self,
        tracking_number: &str,
        origin: GeoPoint,
        destination: GeoPoint,
        fraction: f64,
        options: &TrackingOptions,
    ) -> Result<ShipmentTrackingState> {
        let started = Instant::now();
        let state =
            match ShipmentTrackingState::build(tracking_number, origin, destination, fraction, options)
            {
                Ok(state) => state,
                Err(e) => {
                    self.reject(tracking_number, &e);
                    return Err(e);
                }
            };

        let latency_us = started.elapsed().as_micros() as u64;
        if let Some(metrics) = &self.metrics {
            metrics.record_route(state.route_kind);
            metrics.record_recompute(latency_us);
        }

        info!(
            tracking_number = %tracking_number,
            view_id = %state.view_id,
            route_kind = %state.route_kind,
            waypoints = %state.route.len(),
            progress = %state.progress.fraction,
            total_km = format!("{:.0}", state.progress.total_km),
            "shipment_mounted"
        );

        let replaced = {
            let mut shipments = self.shipments.write();
            let replaced = shipments.insert(tracking_number.to_string(), state.clone()).is_some();
            self.update_gauge(shipments.len());
            replaced
        };
        if replaced {
            debug!(tracking_number = %tracking_number, "shipment_remounted");
        }

        Ok(state)
    }

    /// Recompute progress for a mounted shipment.
    ///
    /// Returns the updated state, or None if nothing is mounted under
    /// `tracking_number`.
    pub fn update_progress(
        &self,
        tracking_number: &str,
        fraction: f64,
    ) -> Result<Option<ShipmentTrackingState>> {
        let started = Instant::now();
        let mut shipments = self.shipments.write();
        let Some(state) = shipments.get_mut(tracking_number) else {
            debug!(tracking_number = %tracking_number, "progress_update_not_mounted");
            return Ok(None);
        };

        if let Err(e) = state.recompute(fraction) {
            drop(shipments);
            self.reject(tracking_number, &e);
            return Err(e);
        }

        let latency_us = started.elapsed().as_micros() as u64;
        if let Some(metrics) = &self.metrics {
            metrics.record_recompute(latency_us);
        }

        debug!(
            tracking_number = %tracking_number,
            progress = %state.progress.fraction,
            segment = %state.progress.segment_index,
            status = %state.status.as_str(),
            "shipment_progress_updated"
        );

        Ok(Some(state.clone()))
    }

    /// Drop a shipment's state. Returns true if it was mounted.
    pub fn unmount(&self, tracking_number: &str) -> bool {
        let mut shipments = self.shipments.write();
        let removed = shipments.remove(tracking_number).is_some();
        self.update_gauge(shipments.len());
        if removed {
            info!(tracking_number = %tracking_number, "shipment_unmounted");
        }
        removed
    }

    pub fn get(&self, tracking_number: &str) -> Option<ShipmentTrackingState> {
        self.shipments.read().get(tracking_number).cloned()
    }

    pub fn contains(&self, tracking_number: &str) -> bool {
        self.shipments.read().contains_key(tracking_number)
    }

    /// All mounted states sorted by tracking number
    pub fn snapshot(&self) -> Vec<ShipmentTrackingState> {
        let mut states: Vec<_> = self.shipments.read().values().cloned().collect();
        states.sort_by(|a, b| a.tracking_number.cmp(&b.tracking_number));
        states
    }

    pub fn len(&self) -> usize {
        self.shipments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shipments.read().is_empty()
    }

    /// Unmount everything
    pub fn clear(&self) {
        let mut shipments = self.shipments.write();
        let count = shipments.len();
        shipments.clear();
        self.update_gauge(0);
        info!(count = %count, "tracking_board_cleared");
    }

    fn reject(&self, tracking_number: &str, error: &TrackingError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_invalid_input();
        }
        warn!(tracking_number = %tracking_number, error = %error, "tracking_input_rejected");
    }

    fn update_gauge(&self, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.set_active_shipments(count as u64);
        }
    }
}
