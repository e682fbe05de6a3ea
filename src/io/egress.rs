//! Tracking egress - appends shipment snapshots to file
//!
//! Snapshots are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::shipment::ShipmentTrackingState;
use crate::infra::metrics::Metrics;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

/// Egress writer for tracking snapshots
pub struct Egress {
    file_path: String,
    metrics: Option<Arc<Metrics>>,
}

impl Egress {
    pub fn new(file_path: &str) -> Self {
        debug!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string(), metrics: None }
    }

    /// Count written and failed snapshots in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Write one snapshot. Returns true if successful.
    pub fn write_state(&self, state: &ShipmentTrackingState) -> bool {
        let result = state
            .to_json()
            .map_err(std::io::Error::other)
            .and_then(|json| self.append_line(&json));

        let success = match result {
            Ok(()) => {
                debug!(
                    tracking_number = %state.tracking_number,
                    status = %state.status.as_str(),
                    progress = %state.progress.fraction,
                    "tracking_snapshot_egressed"
                );
                true
            }
            Err(e) => {
                error!(
                    tracking_number = %state.tracking_number,
                    file = %self.file_path,
                    error = %e,
                    "tracking_egress_failed"
                );
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_egress(success);
        }
        success
    }

    /// Write several snapshots, returning how many succeeded
    pub fn write_states(&self, states: &[ShipmentTrackingState]) -> usize {
        states.iter().filter(|state| self.write_state(state)).count()
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }
}
