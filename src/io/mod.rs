//! IO modules - external system interfaces
//!
//! - `egress` - Tracking snapshots to file (JSONL format)
//! - `prometheus` - Prometheus metrics HTTP endpoint

pub mod egress;
pub mod prometheus;

pub use egress::Egress;
