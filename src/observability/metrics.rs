//! Metrics collection and exposition.
//!
//! # Metrics
//! - `web_core_config_fetch_total` (counter): core fetch outcomes by `outcome`
//! - `web_startup_abort_total` (counter): aborted startups by `stage`
//! - `web_requests_total` (counter): HTTP responses by `status`
//! - `web_app_mode` (gauge): 0=normal, 1=maintenance
//! - `web_sessions_active` (gauge): live web sessions

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::AppMode;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_core_fetch(outcome: &'static str) {
    counter!("web_core_config_fetch_total", "outcome" => outcome).increment(1);
}

pub fn record_startup_abort(stage: &'static str) {
    counter!("web_startup_abort_total", "stage" => stage).increment(1);
}

pub fn record_app_mode(mode: AppMode) {
    let value = match mode {
        AppMode::Normal => 0.0,
        AppMode::Maintenance => 1.0,
    };
    gauge!("web_app_mode").set(value);
}

pub fn record_request(status: u16) {
    counter!("web_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_sessions(count: usize) {
    gauge!("web_sessions_active").set(count as f64);
}
