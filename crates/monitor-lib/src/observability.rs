//! Observability infrastructure for the fleet monitor
//!
//! Provides:
//! - Prometheus metrics (tick latency, evaluation/flag counters, readiness)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_gauge, GaugeVec, Histogram, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for tick latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    tick_latency_seconds: Histogram,
    machines_monitored: IntGauge,
    fleet_ready: IntGauge,
    event_log_entries: IntGauge,
    evaluations_total: IntGauge,
    maintenance_flags_total: IntGauge,
    prediction_errors_total: IntGauge,
    model_bank_info: GaugeVec,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "fleet_monitor_tick_latency_seconds",
                "Time spent evaluating the whole fleet for one tick",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            machines_monitored: register_int_gauge!(
                "fleet_monitor_machines_monitored",
                "Number of machines in the fixed roster"
            )
            .expect("Failed to register machines_monitored"),

            fleet_ready: register_int_gauge!(
                "fleet_monitor_fleet_ready",
                "1 when every machine's sequence window is full, else 0"
            )
            .expect("Failed to register fleet_ready"),

            event_log_entries: register_int_gauge!(
                "fleet_monitor_event_log_entries",
                "Entries currently held in the rolling maintenance event log"
            )
            .expect("Failed to register event_log_entries"),

            evaluations_total: register_int_gauge!(
                "fleet_monitor_evaluations_total",
                "Total number of per-machine evaluations produced"
            )
            .expect("Failed to register evaluations_total"),

            maintenance_flags_total: register_int_gauge!(
                "fleet_monitor_maintenance_flags_total",
                "Total number of maintenance-required flags raised"
            )
            .expect("Failed to register maintenance_flags_total"),

            prediction_errors_total: register_int_gauge!(
                "fleet_monitor_prediction_errors_total",
                "Total number of predictions recovered with a sentinel"
            )
            .expect("Failed to register prediction_errors_total"),

            model_bank_info: register_gauge_vec!(
                "fleet_monitor_model_bank_info",
                "Information about the loaded model bank",
                &["seq_length", "classes"]
            )
            .expect("Failed to register model_bank_info"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn set_machines_monitored(&self, count: i64) {
        self.inner().machines_monitored.set(count);
    }

    pub fn set_fleet_ready(&self, ready: bool) {
        self.inner().fleet_ready.set(i64::from(ready));
    }

    pub fn set_event_log_entries(&self, count: i64) {
        self.inner().event_log_entries.set(count);
    }

    pub fn inc_evaluations(&self) {
        self.inner().evaluations_total.inc();
    }

    pub fn inc_maintenance_flags(&self) {
        self.inner().maintenance_flags_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn set_model_bank_info(&self, seq_length: usize, classes: usize) {
        self.inner().model_bank_info.reset();
        self.inner()
            .model_bank_info
            .with_label_values(&[&seq_length.to_string(), &classes.to_string()])
            .set(1.0);
    }
}

/// Structured logger for significant monitor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, artifacts_dir: &str, machines: usize) {
        info!(
            event = "startup",
            instance = %self.instance,
            version = %version,
            artifacts_dir = %artifacts_dir,
            machines = machines,
            "Fleet monitor starting"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fleet monitor shutting down"
        );
    }

    pub fn log_tick(&self, machines: usize, flagged: usize, all_ready: bool, elapsed_ms: u64) {
        if flagged > 0 {
            warn!(
                event = "fleet_tick",
                instance = %self.instance,
                machines = machines,
                flagged = flagged,
                all_ready = all_ready,
                elapsed_ms = elapsed_ms,
                "Fleet tick complete with flagged machines"
            );
        } else {
            info!(
                event = "fleet_tick",
                instance = %self.instance,
                machines = machines,
                flagged = flagged,
                all_ready = all_ready,
                elapsed_ms = elapsed_ms,
                "Fleet tick complete"
            );
        }
    }

    pub fn log_reset(&self) {
        info!(
            event = "session_reset",
            instance = %self.instance,
            "Sequence buffers and event log cleared"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle_is_cloneable_and_usable() {
        let metrics = MonitorMetrics::new();
        let clone = metrics.clone();

        metrics.observe_tick_latency(0.003);
        clone.set_machines_monitored(50);
        clone.set_fleet_ready(true);
        metrics.inc_evaluations();
        metrics.inc_maintenance_flags();
        metrics.inc_prediction_errors();
        metrics.set_event_log_entries(3);
        metrics.set_model_bank_info(10, 4);
    }

    #[test]
    fn test_structured_logger_does_not_panic() {
        let logger = StructuredLogger::new("test-instance");
        logger.log_startup("0.1.0", "/tmp/artifacts", 50);
        logger.log_tick(50, 2, true, 12);
        logger.log_reset();
        logger.log_shutdown("test");
    }
}
