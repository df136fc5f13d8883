//! Prometheus text exposition for `/metrics`

use crate::infra::metrics::{
    Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS,
};
use std::fmt::Write;

/// Prometheus content type for the text format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge)
fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum {sum}");
    let _ = writeln!(output, "{name}_count {cumulative}");
}

/// Format metrics in Prometheus text exposition format
///
/// Reads a non-resetting snapshot so scrapes don't disturb the periodic
/// log reporter.
pub fn format_prometheus_metrics(metrics: &Metrics, stored_receipts: usize) -> String {
    let summary = metrics.snapshot(stored_receipts);
    let mut output = String::with_capacity(2048);

    write_receipt_metrics(&mut output, &summary);
    write_lookup_metrics(&mut output, &summary);
    write_latency_metrics(&mut output, &summary);

    output
}

fn write_receipt_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "receipts_processed_total",
        "Receipts accepted and scored",
        MetricType::Counter,
        summary.receipts_processed_total,
    );
    write_metric(
        output,
        "receipts_rejected_total",
        "Receipts rejected as malformed or invalid",
        MetricType::Counter,
        summary.receipts_rejected_total,
    );
    write_metric(
        output,
        "receipts_points_awarded_total",
        "Sum of points awarded to accepted receipts",
        MetricType::Counter,
        summary.points_awarded_total,
    );
    write_metric(
        output,
        "receipts_stored",
        "Receipts currently held in memory",
        MetricType::Gauge,
        summary.stored_receipts as u64,
    );
}

fn write_lookup_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "receipts_lookups_total",
        "Points lookups served",
        MetricType::Counter,
        summary.lookups_total,
    );
    write_metric(
        output,
        "receipts_lookup_misses_total",
        "Points lookups for unknown receipt ids",
        MetricType::Counter,
        summary.lookup_misses_total,
    );
}

fn write_latency_metrics(output: &mut String, summary: &MetricsSummary) {
    write_histogram(
        output,
        "receipts_submit_latency_us",
        "Receipt scoring and storage latency in microseconds",
        &summary.submit_latency_buckets,
        summary.submit_latency_sum_us,
    );
    write_metric(
        output,
        "receipts_submit_latency_p50_us",
        "50th percentile submit latency",
        MetricType::Gauge,
        summary.submit_latency_p50_us,
    );
    write_metric(
        output,
        "receipts_submit_latency_p95_us",
        "95th percentile submit latency",
        MetricType::Gauge,
        summary.submit_latency_p95_us,
    );
    write_metric(
        output,
        "receipts_submit_latency_p99_us",
        "99th percentile submit latency",
        MetricType::Gauge,
        summary.submit_latency_p99_us,
    );
}
