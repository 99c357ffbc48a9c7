//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_resolutions_total` (counter): resolutions by outcome
//! - `dispatch_resolve_duration_seconds` (histogram): end-to-end resolve latency
//! - `dispatch_cache_lookups_total` (counter): lookups by tier and result
//! - `dispatch_cache_local_entries` (gauge): entries in the in-process tier
//! - `dispatch_cache_shared_errors_total` (counter): failed shared-store calls by op
//! - `dispatch_security_violations_total` (counter): rejections by rule and severity
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Label values are static strings to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::security::{Rule, Severity};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_resolution(outcome: &'static str, start: Instant) {
    counter!("dispatch_resolutions_total", "outcome" => outcome).increment(1);
    histogram!("dispatch_resolve_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(tier: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("dispatch_cache_lookups_total", "tier" => tier, "result" => result).increment(1);
}

pub fn record_local_entries(size: usize) {
    gauge!("dispatch_cache_local_entries").set(size as f64);
}

pub fn record_shared_error(op: &'static str) {
    counter!("dispatch_cache_shared_errors_total", "op" => op).increment(1);
}

pub fn record_violation(rule: Rule, severity: Severity) {
    counter!(
        "dispatch_security_violations_total",
        "rule" => rule.as_str(),
        "severity" => severity.as_str()
    )
    .increment(1);
}
