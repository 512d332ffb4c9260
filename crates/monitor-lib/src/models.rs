//! Core data models for the fleet monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine identifier within the fixed fleet roster
pub type MachineId = u32;

/// Label emitted by the sequence classifier for a healthy machine
pub const NORMAL_LABEL: &str = "Normal";

/// Display sentinel for an unavailable failure classification.
///
/// Kept verbatim from the operator dashboard this pipeline feeds; consumers
/// render it when `MachineEvaluation::failure_type` is `None`.
pub const INSUFFICIENT_DATA_LABEL: &str = "예측 불가";

/// RUL threshold (hours) below which maintenance is flagged
pub const RUL_THRESHOLD_HOURS: f32 = 20.0;

/// Maximum number of entries retained in the maintenance event log
pub const EVENT_LOG_CAP: usize = 5;

/// One sensor reading from a single machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f32,
    pub vibration: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub energy_consumption: f32,
    /// Minutes since the previous reading in the same buffer (0 for the first)
    pub delta_minutes: f32,
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// Look up a sensor column by its configured name
    pub fn sensor_value(&self, column: &str) -> Option<f32> {
        match column {
            "temperature" => Some(self.temperature),
            "vibration" => Some(self.vibration),
            "pressure" => Some(self.pressure),
            "humidity" => Some(self.humidity),
            "energy_consumption" => Some(self.energy_consumption),
            _ => None,
        }
    }
}

/// Per-machine, per-tick evaluation result
///
/// `None` fields are visible sentinels: the prediction was attempted and
/// failed, or (for `failure_type`) the sequence window is not yet full.
/// `latest_reading` is `None` only when the machine has no buffered data
/// at all (its sampler failed before the first reading arrived).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineEvaluation {
    pub machine_id: MachineId,
    pub predicted_rul: Option<f32>,
    pub downtime_risk: Option<u8>,
    pub failure_type: Option<String>,
    pub maintenance_required: bool,
    pub window_full: bool,
    pub latest_reading: Option<SensorReading>,
}

impl MachineEvaluation {
    /// Failure label as shown to the operator
    pub fn failure_type_display(&self) -> &str {
        self.failure_type
            .as_deref()
            .unwrap_or(INSUFFICIENT_DATA_LABEL)
    }
}

/// Result of a direct prediction over an operator-supplied reading
///
/// Bypasses the sequence buffer entirely: only the risk classifier and the
/// machine's RUL regressor run, so there is no window gate and no failure
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPrediction {
    pub machine_id: MachineId,
    pub predicted_rul: Option<f32>,
    pub downtime_risk: Option<u8>,
    pub maintenance_required: bool,
}

/// Compact record appended to the rolling event log when a machine is flagged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub timestamp: DateTime<Utc>,
    pub machine_id: MachineId,
    pub failure_type: Option<String>,
    pub downtime_risk: Option<u8>,
    pub predicted_rul: Option<f32>,
}

/// Full-fleet tick output handed to presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub evaluated_at: DateTime<Utc>,
    /// One row per roster machine, sorted by machine id
    pub evaluations: Vec<MachineEvaluation>,
    /// True iff every machine's sequence window is full
    pub all_ready: bool,
    /// Rolling maintenance event log (most recent last, capped)
    pub events: Vec<MaintenanceEvent>,
}

impl FleetSnapshot {
    /// Number of machines currently flagged for maintenance
    pub fn flagged_count(&self) -> usize {
        self.evaluations
            .iter()
            .filter(|e| e.maintenance_required)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SensorReading {
        SensorReading {
            temperature: 75.0,
            vibration: 50.0,
            pressure: 3.0,
            humidity: 55.0,
            energy_consumption: 2.5,
            delta_minutes: 0.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_sensor_value_lookup() {
        let r = reading();
        assert_eq!(r.sensor_value("temperature"), Some(75.0));
        assert_eq!(r.sensor_value("energy_consumption"), Some(2.5));
        assert_eq!(r.sensor_value("delta_minutes"), None);
        assert_eq!(r.sensor_value("bogus"), None);
    }

    #[test]
    fn test_failure_type_display_sentinel() {
        let eval = MachineEvaluation {
            machine_id: 1,
            predicted_rul: None,
            downtime_risk: None,
            failure_type: None,
            maintenance_required: false,
            window_full: false,
            latest_reading: Some(reading()),
        };
        assert_eq!(eval.failure_type_display(), INSUFFICIENT_DATA_LABEL);
    }
}
