//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for all recording operations. Reporting swaps the periodic
//! counters to zero, so the only synchronization is the report timestamp.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are
//! statistical counters only and must not drive logic decisions.

use crate::domain::route::RouteKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤5, ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, >2560
const BUCKET_BOUNDS: [u64; 10] = [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560];
const NUM_BUCKETS: usize = 11;

/// Upper bound reported for each bucket (overflow uses 2x the last bound)
const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] = [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];

const NUM_ROUTE_KINDS: usize = RouteKind::ALL.len();

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn route_kind_index(kind: RouteKind) -> usize {
    match kind {
        RouteKind::TransPacificEastbound => 0,
        RouteKind::TransPacificWestbound => 1,
        RouteKind::TransAtlanticEastbound => 2,
        RouteKind::TransAtlanticWestbound => 3,
        RouteKind::Regional => 4,
    }
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Routes synthesized per kind (monotonic), indexed by `route_kind_index`
    routes_by_kind: [AtomicU64; NUM_ROUTE_KINDS],
    /// Inputs rejected at the entry boundary (monotonic)
    invalid_inputs_total: AtomicU64,
    /// Progress recomputations (monotonic)
    recomputes_total: AtomicU64,
    /// Recomputations since last report (reset on report)
    recomputes_since_report: AtomicU64,
    /// Sum of recompute latencies in microseconds (reset on report)
    recompute_latency_sum_us: AtomicU64,
    /// Max recompute latency in microseconds (reset on report)
    recompute_latency_max_us: AtomicU64,
    /// Recompute latency histogram buckets (reset on report)
    recompute_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Cumulative recompute latency histogram for scraping (monotonic)
    recompute_latency_buckets_total: [AtomicU64; NUM_BUCKETS],
    /// Cumulative recompute latency sum for scraping (monotonic)
    recompute_latency_sum_total_us: AtomicU64,
    /// Shipments currently mounted on the board
    active_shipments: AtomicU64,
    /// Snapshots written to egress (monotonic)
    egress_written_total: AtomicU64,
    /// Snapshots that failed to write (monotonic)
    egress_failed_total: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            routes_by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            invalid_inputs_total: AtomicU64::new(0),
            recomputes_total: AtomicU64::new(0),
            recomputes_since_report: AtomicU64::new(0),
            recompute_latency_sum_us: AtomicU64::new(0),
            recompute_latency_max_us: AtomicU64::new(0),
            recompute_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            recompute_latency_buckets_total: std::array::from_fn(|_| AtomicU64::new(0)),
            recompute_latency_sum_total_us: AtomicU64::new(0),
            active_shipments: AtomicU64::new(0),
            egress_written_total: AtomicU64::new(0),
            egress_failed_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a freshly synthesized route
    #[inline]
    pub fn record_route(&self, kind: RouteKind) {
        self.routes_by_kind[route_kind_index(kind)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalid_input(&self) {
        self.invalid_inputs_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a progress recomputation with its latency (lock-free)
    #[inline]
    pub fn record_recompute(&self, latency_us: u64) {
        self.recomputes_total.fetch_add(1, Ordering::Relaxed);
        self.recomputes_since_report.fetch_add(1, Ordering::Relaxed);
        self.recompute_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.recompute_latency_sum_total_us.fetch_add(latency_us, Ordering::Relaxed);
        let bucket = bucket_index(latency_us);
        self.recompute_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.recompute_latency_buckets_total[bucket].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.recompute_latency_max_us, latency_us);
    }

    #[inline]
    pub fn set_active_shipments(&self, count: u64) {
        self.active_shipments.store(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_egress(&self, success: bool) {
        if success {
            self.egress_written_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.egress_failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn routes_total(&self, kind: RouteKind) -> u64 {
        self.routes_by_kind[route_kind_index(kind)].load(Ordering::Relaxed)
    }

    pub fn invalid_inputs_total(&self) -> u64 {
        self.invalid_inputs_total.load(Ordering::Relaxed)
    }

    pub fn recomputes_total(&self) -> u64 {
        self.recomputes_total.load(Ordering::Relaxed)
    }

    pub fn active_shipments(&self) -> u64 {
        self.active_shipments.load(Ordering::Relaxed)
    }

    pub fn egress_written_total(&self) -> u64 {
        self.egress_written_total.load(Ordering::Relaxed)
    }

    pub fn egress_failed_total(&self) -> u64 {
        self.egress_failed_total.load(Ordering::Relaxed)
    }

    /// Cumulative latency histogram and sum since startup. Not reset by `report`.
    pub fn recompute_latency_totals(&self) -> ([u64; NUM_BUCKETS], u64) {
        let mut buckets = [0u64; NUM_BUCKETS];
        for (i, bucket) in self.recompute_latency_buckets_total.iter().enumerate() {
            buckets[i] = bucket.load(Ordering::Relaxed);
        }
        (buckets, self.recompute_latency_sum_total_us.load(Ordering::Relaxed))
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let recompute_count = self.recomputes_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.recompute_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.recompute_latency_max_us.swap(0, Ordering::Relaxed);
        let latency_buckets = swap_buckets(&self.recompute_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let recomputes_per_sec = if elapsed.as_secs_f64() > 0.0 {
            recompute_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if recompute_count > 0 { latency_sum / recompute_count } else { 0 };

        let mut routes_by_kind = [0u64; NUM_ROUTE_KINDS];
        for (i, counter) in self.routes_by_kind.iter().enumerate() {
            routes_by_kind[i] = counter.load(Ordering::Relaxed);
        }

        MetricsSummary {
            routes_by_kind,
            invalid_inputs_total: self.invalid_inputs_total.load(Ordering::Relaxed),
            recomputes_total: self.recomputes_total.load(Ordering::Relaxed),
            recomputes_per_sec,
            recompute_latency_buckets: latency_buckets,
            recompute_latency_avg_us: avg_latency,
            recompute_latency_max_us: latency_max,
            recompute_latency_p50_us: percentile_from_buckets(&latency_buckets, 0.50),
            recompute_latency_p99_us: percentile_from_buckets(&latency_buckets, 0.99),
            active_shipments: self.active_shipments.load(Ordering::Relaxed),
            egress_written_total: self.egress_written_total.load(Ordering::Relaxed),
            egress_failed_total: self.egress_failed_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of histogram buckets (exported for Prometheus formatting)
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Exported bucket bounds for Prometheus formatting
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

#[derive(Debug)]
pub struct MetricsSummary {
    /// Routes synthesized, in `RouteKind::ALL` order
    pub routes_by_kind: [u64; NUM_ROUTE_KINDS],
    pub invalid_inputs_total: u64,
    pub recomputes_total: u64,
    pub recomputes_per_sec: f64,
    /// Bounds: ≤5, ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, >2560 µs
    pub recompute_latency_buckets: [u64; NUM_BUCKETS],
    pub recompute_latency_avg_us: u64,
    pub recompute_latency_max_us: u64,
    pub recompute_latency_p50_us: u64,
    pub recompute_latency_p99_us: u64,
    pub active_shipments: u64,
    pub egress_written_total: u64,
    pub egress_failed_total: u64,
}

impl MetricsSummary {
    pub fn routes_total(&self) -> u64 {
        self.routes_by_kind.iter().sum()
    }

    pub fn log(&self) {
        info!(
            active_shipments = %self.active_shipments,
            routes_total = %self.routes_total(),
            recomputes_total = %self.recomputes_total,
            recomputes_per_sec = format!("{:.1}", self.recomputes_per_sec),
            avg_latency_us = %self.recompute_latency_avg_us,
            max_latency_us = %self.recompute_latency_max_us,
            p99_us = %self.recompute_latency_p99_us,
            invalid_inputs = %self.invalid_inputs_total,
            egress_written = %self.egress_written_total,
            "metrics"
        );
    }
}
