//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations so request handlers never contend
//! on a mutex. `report()` swaps the periodic counters to zero; `snapshot()`
//! reads without resetting and backs the `/metrics` endpoint.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only; do not use them for coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
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

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].load(Ordering::Relaxed))
}

/// Read a counter, optionally resetting it
#[inline]
fn take(counter: &AtomicU64, reset: bool) -> u64 {
    if reset {
        counter.swap(0, Ordering::Relaxed)
    } else {
        counter.load(Ordering::Relaxed)
    }
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

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

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
    /// Receipts accepted and scored (monotonic)
    receipts_processed_total: AtomicU64,
    /// Receipts accepted since last report (reset on report)
    receipts_since_report: AtomicU64,
    /// Receipts rejected by decoding or validation (monotonic)
    receipts_rejected_total: AtomicU64,
    /// Sum of all points awarded (monotonic)
    points_awarded_total: AtomicU64,
    /// Points lookups served (monotonic)
    lookups_total: AtomicU64,
    /// Lookups for ids that were never issued (monotonic)
    lookup_misses_total: AtomicU64,
    /// Submit latency histogram buckets (cumulative)
    submit_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of submit latencies (cumulative)
    submit_latency_sum_us: AtomicU64,
    /// Sum of submit latencies since last report (reset on report)
    submit_latency_period_sum_us: AtomicU64,
    /// Max submit latency since last report (reset on report)
    submit_latency_max_us: AtomicU64,
    /// Last report time (only touched by the reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            receipts_processed_total: AtomicU64::new(0),
            receipts_since_report: AtomicU64::new(0),
            receipts_rejected_total: AtomicU64::new(0),
            points_awarded_total: AtomicU64::new(0),
            lookups_total: AtomicU64::new(0),
            lookup_misses_total: AtomicU64::new(0),
            submit_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            submit_latency_sum_us: AtomicU64::new(0),
            submit_latency_period_sum_us: AtomicU64::new(0),
            submit_latency_max_us: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record an accepted receipt with its submit latency and points (lock-free)
    #[inline]
    pub fn record_receipt_processed(&self, latency_us: u64, points: u64) {
        self.receipts_processed_total.fetch_add(1, Ordering::Relaxed);
        self.receipts_since_report.fetch_add(1, Ordering::Relaxed);
        self.points_awarded_total.fetch_add(points, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.submit_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.submit_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.submit_latency_period_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        update_atomic_max(&self.submit_latency_max_us, latency_us);
    }

    /// Record a rejected receipt (lock-free)
    #[inline]
    pub fn record_receipt_rejected(&self) {
        self.receipts_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a points lookup (lock-free)
    #[inline]
    pub fn record_lookup(&self, found: bool) {
        self.lookups_total.fetch_add(1, Ordering::Relaxed);
        if !found {
            self.lookup_misses_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn receipts_processed_total(&self) -> u64 {
        self.receipts_processed_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn receipts_rejected_total(&self) -> u64 {
        self.receipts_rejected_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lookups_total(&self) -> u64 {
        self.lookups_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lookup_misses_total(&self) -> u64 {
        self.lookup_misses_total.load(Ordering::Relaxed)
    }

    /// Calculate the summary, then reset periodic counters
    ///
    /// This is the only method that resets counters. It uses atomic swap
    /// to get a consistent snapshot while allowing concurrent updates.
    pub fn report(&self, stored_receipts: usize) -> MetricsSummary {
        self.summarize(stored_receipts, true)
    }

    /// Calculate the summary without resetting anything
    pub fn snapshot(&self, stored_receipts: usize) -> MetricsSummary {
        self.summarize(stored_receipts, false)
    }

    fn summarize(&self, stored_receipts: usize, reset: bool) -> MetricsSummary {
        let period_count = take(&self.receipts_since_report, reset);
        let period_latency_sum = take(&self.submit_latency_period_sum_us, reset);
        let max_latency = take(&self.submit_latency_max_us, reset);

        let elapsed = if reset {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        } else {
            self.last_report_time.lock().elapsed()
        };

        let receipts_per_sec = if elapsed.as_secs_f64() > 0.0 {
            period_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency = if period_count > 0 { period_latency_sum / period_count } else { 0 };

        let latency_buckets = load_buckets(&self.submit_latency_buckets);

        MetricsSummary {
            receipts_processed_total: self.receipts_processed_total.load(Ordering::Relaxed),
            receipts_rejected_total: self.receipts_rejected_total.load(Ordering::Relaxed),
            points_awarded_total: self.points_awarded_total.load(Ordering::Relaxed),
            lookups_total: self.lookups_total.load(Ordering::Relaxed),
            lookup_misses_total: self.lookup_misses_total.load(Ordering::Relaxed),
            stored_receipts,
            receipts_per_sec,
            avg_submit_latency_us: avg_latency,
            max_submit_latency_us: max_latency,
            submit_latency_p50_us: percentile_from_buckets(&latency_buckets, 0.50),
            submit_latency_p95_us: percentile_from_buckets(&latency_buckets, 0.95),
            submit_latency_p99_us: percentile_from_buckets(&latency_buckets, 0.99),
            submit_latency_sum_us: self.submit_latency_sum_us.load(Ordering::Relaxed),
            submit_latency_buckets: latency_buckets,
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
    pub receipts_processed_total: u64,
    pub receipts_rejected_total: u64,
    pub points_awarded_total: u64,
    pub lookups_total: u64,
    pub lookup_misses_total: u64,
    /// Receipts currently held by the store
    pub stored_receipts: usize,
    /// Accepted receipts per second over the current period
    pub receipts_per_sec: f64,
    pub avg_submit_latency_us: u64,
    pub max_submit_latency_us: u64,
    pub submit_latency_p50_us: u64,
    pub submit_latency_p95_us: u64,
    pub submit_latency_p99_us: u64,
    /// Cumulative submit latency (µs) for the histogram `_sum`
    pub submit_latency_sum_us: u64,
    /// Cumulative submit latency histogram buckets
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub submit_latency_buckets: [u64; NUM_BUCKETS],
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            receipts_total = %self.receipts_processed_total,
            receipts_per_sec = format!("{:.1}", self.receipts_per_sec),
            rejected_total = %self.receipts_rejected_total,
            stored = %self.stored_receipts,
            lookups_total = %self.lookups_total,
            lookup_misses = %self.lookup_misses_total,
            avg_latency_us = %self.avg_submit_latency_us,
            max_latency_us = %self.max_submit_latency_us,
            p50_us = %self.submit_latency_p50_us,
            p95_us = %self.submit_latency_p95_us,
            p99_us = %self.submit_latency_p99_us,
            "metrics"
        );
    }
}
