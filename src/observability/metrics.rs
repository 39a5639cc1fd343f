//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chassis_stage_duration_seconds` (histogram): bootstrap stage latency
//! - `chassis_stage_total` (counter): stage outcomes by name and result
//! - `chassis_plugins_initialized` (gauge): plugins that completed init
//!
//! # Design Decisions
//! - Recording is unconditional and cheap; exposition is opt-in via config
//! - A second exporter install in one process is ignored (recorder is global)

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the Prometheus exporter on the given address.
pub fn init(addr: SocketAddr) {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics exporter already installed");
        return;
    }
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record one bootstrap stage run.
pub(crate) fn record_stage(stage: &'static str, elapsed: Duration, ok: bool) {
    metrics::histogram!("chassis_stage_duration_seconds", "stage" => stage)
        .record(elapsed.as_secs_f64());
    metrics::counter!(
        "chassis_stage_total",
        "stage" => stage,
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

/// Record how many plugins completed initialization.
pub(crate) fn record_plugins_initialized(count: usize) {
    metrics::gauge!("chassis_plugins_initialized").set(count as f64);
}
