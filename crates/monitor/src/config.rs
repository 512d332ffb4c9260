//! Daemon configuration

use anyhow::Result;
use monitor_lib::scheduler::SchedulerConfig;
use serde::Deserialize;
use std::time::Duration;

/// Fleet monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Instance name used in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/control endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the model artifacts (bundle + ONNX files)
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    /// Number of machines in the fixed roster (ids 1..=count)
    #[serde(default = "default_machine_count")]
    pub machine_count: u32,

    /// Initial refresh interval between fleet ticks, in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Lower bound for operator interval adjustments, in seconds
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,

    /// Upper bound for operator interval adjustments, in seconds
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,

    /// Whether the tick loop starts evaluating immediately
    #[serde(default = "default_start_running")]
    pub start_running: bool,

    /// Fixed seed for the synthetic sampler; omit for entropy seeding
    #[serde(default)]
    pub sampler_seed: Option<u64>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fleet-monitor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifacts_dir() -> String {
    "./artifacts".to_string()
}

fn default_machine_count() -> u32 {
    50
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_min_interval() -> u64 {
    1
}

fn default_max_interval() -> u64 {
    10
}

fn default_start_running() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            artifacts_dir: default_artifacts_dir(),
            machine_count: default_machine_count(),
            refresh_interval_secs: default_refresh_interval(),
            min_interval_secs: default_min_interval(),
            max_interval_secs: default_max_interval(),
            start_running: default_start_running(),
            sampler_seed: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the environment (prefix `MONITOR_`)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.refresh_interval_secs),
            min_interval: Duration::from_secs(self.min_interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs),
            start_running: self.start_running,
            ..SchedulerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.machine_count, 50);
        assert_eq!(config.refresh_interval_secs, 5);
        assert!(config.start_running);
        assert!(config.sampler_seed.is_none());
    }

    #[test]
    fn test_scheduler_config_conversion() {
        let config = MonitorConfig {
            refresh_interval_secs: 7,
            min_interval_secs: 2,
            max_interval_secs: 20,
            start_running: false,
            ..Default::default()
        };
        let sched = config.scheduler_config();
        assert_eq!(sched.interval, Duration::from_secs(7));
        assert_eq!(sched.min_interval, Duration::from_secs(2));
        assert_eq!(sched.max_interval, Duration::from_secs(20));
        assert!(!sched.start_running);
    }
}
