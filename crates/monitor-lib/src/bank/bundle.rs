//! Persisted model configuration bundle
//!
//! The bundle ships alongside the model files and carries everything the
//! bank needs that is not baked into the networks themselves: the sensor
//! column order, the sequence length, the fitted feature scaler, the fixed
//! label encoding, and any per-machine RUL input scalers.

use crate::error::{ArtifactError, PredictionError};
use crate::models::MachineId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Sensor columns a bundle may reference
const KNOWN_SENSOR_COLS: &[&str] = &[
    "temperature",
    "vibration",
    "pressure",
    "humidity",
    "energy_consumption",
];

/// Fitted min-max feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f32>,
    pub data_max: Vec<f32>,
}

impl MinMaxScaler {
    pub fn dims(&self) -> usize {
        self.data_min.len()
    }

    /// Scale a feature row in place to the fitted [0, 1] range.
    ///
    /// A column with zero fitted range maps to 0 rather than dividing by
    /// zero; a dimension mismatch is an inference-input error.
    pub fn transform(&self, row: &mut [f32]) -> Result<(), PredictionError> {
        if row.len() != self.dims() {
            return Err(PredictionError::Inference(format!(
                "feature row has {} columns, scaler fitted on {}",
                row.len(),
                self.dims()
            )));
        }
        for (i, value) in row.iter_mut().enumerate() {
            let range = self.data_max[i] - self.data_min[i];
            *value = if range.abs() < f32::EPSILON {
                0.0
            } else {
                (*value - self.data_min[i]) / range
            };
        }
        Ok(())
    }
}

/// Fixed label-to-index mapping for the sequence classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoding {
    pub classes: Vec<String>,
}

impl LabelEncoding {
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Model configuration bundle loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub sensor_cols: Vec<String>,
    pub seq_length: usize,
    /// Scaler fitted on `sensor_cols + delta_minutes`
    pub scaler: MinMaxScaler,
    pub label_encoder: LabelEncoding,
    /// Optional per-machine RUL input scalers, fitted on `sensor_cols`
    #[serde(default)]
    pub rul_scalers: HashMap<MachineId, MinMaxScaler>,
}

impl ModelBundle {
    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let bundle: ModelBundle = serde_json::from_str(&raw)
            .map_err(|e| ArtifactError::MalformedBundle(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Feature columns for the sequence classifier: sensor columns plus the
    /// derived delta_minutes column.
    pub fn feature_count(&self) -> usize {
        self.sensor_cols.len() + 1
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.sensor_cols.is_empty() {
            return Err(ArtifactError::MalformedBundle(
                "sensor_cols is empty".into(),
            ));
        }
        for col in &self.sensor_cols {
            if !KNOWN_SENSOR_COLS.contains(&col.as_str()) {
                return Err(ArtifactError::MalformedBundle(format!(
                    "unknown sensor column '{}'",
                    col
                )));
            }
        }
        if self.seq_length == 0 {
            return Err(ArtifactError::MalformedBundle("seq_length is zero".into()));
        }
        if self.scaler.data_min.len() != self.scaler.data_max.len() {
            return Err(ArtifactError::MalformedBundle(
                "scaler min/max lengths differ".into(),
            ));
        }
        if self.scaler.dims() != self.feature_count() {
            return Err(ArtifactError::MalformedBundle(format!(
                "scaler fitted on {} columns, expected {} (sensor_cols + delta_minutes)",
                self.scaler.dims(),
                self.feature_count()
            )));
        }
        if self.label_encoder.is_empty() {
            return Err(ArtifactError::MalformedBundle(
                "label encoding has no classes".into(),
            ));
        }
        for (id, scaler) in &self.rul_scalers {
            if scaler.dims() != self.sensor_cols.len() {
                return Err(ArtifactError::MalformedBundle(format!(
                    "RUL scaler for machine {} fitted on {} columns, expected {}",
                    id,
                    scaler.dims(),
                    self.sensor_cols.len()
                )));
            }
        }
        Ok(())
    }
}
