//! Model bank: three heterogeneous predictors behind one contract each
//!
//! The bank hides model shapes, feature scaling, and label decoding from
//! the evaluation engine. All predictors are loaded once at startup and
//! are read-only for the process lifetime.

mod bundle;
mod onnx;

pub use bundle::{LabelEncoding, MinMaxScaler, ModelBundle};
pub use onnx::{OnnxRegressor, OnnxRiskClassifier, OnnxSequenceClassifier};

use crate::error::PredictionError;
use crate::models::{MachineId, SensorReading};
use std::collections::HashMap;

/// Sequence failure classifier over a full window of feature vectors.
///
/// Input rows are already scaled; output is one score per class in the
/// bundle's label encoding order.
pub trait SequenceModel: Send + Sync {
    fn class_scores(&self, window: &[Vec<f32>]) -> Result<Vec<f32>, PredictionError>;
}

/// Per-machine RUL regressor over a single feature vector
pub trait RegressionModel: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<f32, PredictionError>;
}

/// Binary downtime-risk classifier over `{temperature, vibration}`
pub trait RiskModel: Send + Sync {
    fn predict(&self, temperature: f32, vibration: f32) -> Result<u8, PredictionError>;
}

/// A machine's regressor plus its optional fitted input scaler
pub struct RulEntry {
    pub model: Box<dyn RegressionModel>,
    pub scaler: Option<MinMaxScaler>,
}

/// Immutable bank of the three fleet predictors
pub struct ModelBank {
    bundle: ModelBundle,
    sequence: Box<dyn SequenceModel>,
    regressors: HashMap<MachineId, RulEntry>,
    risk: Box<dyn RiskModel>,
}

impl std::fmt::Debug for ModelBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBank")
            .field("bundle", &self.bundle)
            .field("regressors", &self.regressors.keys())
            .finish_non_exhaustive()
    }
}

impl ModelBank {
    pub fn new(
        bundle: ModelBundle,
        sequence: Box<dyn SequenceModel>,
        regressors: HashMap<MachineId, RulEntry>,
        risk: Box<dyn RiskModel>,
    ) -> Self {
        Self {
            bundle,
            sequence,
            regressors,
            risk,
        }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn seq_length(&self) -> usize {
        self.bundle.seq_length
    }

    /// Sensor feature vector for the RUL regressors (bundle column order)
    fn sensor_features(&self, reading: &SensorReading) -> Vec<f32> {
        self.bundle
            .sensor_cols
            .iter()
            .map(|col| reading.sensor_value(col).unwrap_or_default())
            .collect()
    }

    /// Sequence classification over a full window.
    ///
    /// Applies the bundle's fitted scaler to every row (sensor columns +
    /// delta_minutes) and decodes the argmax score through the bundle's
    /// fixed label encoding.
    pub fn predict_sequence(&self, window: &[SensorReading]) -> Result<String, PredictionError> {
        let need = self.bundle.seq_length;
        if window.len() < need {
            return Err(PredictionError::InsufficientWindow {
                got: window.len(),
                need,
            });
        }

        let rows: Vec<Vec<f32>> = window
            .iter()
            .map(|r| {
                let mut row = self.sensor_features(r);
                row.push(r.delta_minutes);
                self.bundle.scaler.transform(&mut row)?;
                Ok(row)
            })
            .collect::<Result<_, PredictionError>>()?;

        let scores = self.sequence.class_scores(&rows)?;
        let best = argmax(&scores)
            .ok_or_else(|| PredictionError::BadOutput("empty class score vector".into()))?;
        self.bundle
            .label_encoder
            .decode(best)
            .map(str::to_owned)
            .ok_or_else(|| {
                PredictionError::BadOutput(format!(
                    "class index {} outside label encoding of {} classes",
                    best,
                    self.bundle.label_encoder.len()
                ))
            })
    }

    /// RUL estimate in hours for one machine from its latest reading.
    ///
    /// A lookup miss is `UnknownMachine`: the roster is fixed at load time,
    /// so callers treat it as fatal rather than substituting a sentinel.
    pub fn predict_rul(
        &self,
        machine_id: MachineId,
        reading: &SensorReading,
    ) -> Result<f32, PredictionError> {
        let entry = self
            .regressors
            .get(&machine_id)
            .ok_or(PredictionError::UnknownMachine(machine_id))?;

        let mut features = self.sensor_features(reading);
        if let Some(scaler) = &entry.scaler {
            scaler.transform(&mut features)?;
        }
        let hours = entry.model.predict(&features)?;
        Ok(hours.max(0.0))
    }

    /// Binary downtime risk from temperature and vibration; no scaling,
    /// uniform across machines.
    pub fn predict_risk(&self, reading: &SensorReading) -> Result<u8, PredictionError> {
        self.risk.predict(reading.temperature, reading.vibration)
    }
}

fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}
