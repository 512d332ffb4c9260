//! ONNX-backed predictors using tract
//!
//! All three fleet models ship as ONNX graphs and are loaded once into
//! optimized tract plans. Inference is pure CPU and lock-free; the plans
//! are immutable after load.

use super::bundle::ModelBundle;
use super::{ModelBank, RegressionModel, RiskModel, RulEntry, SequenceModel};
use crate::error::{ArtifactError, PredictionError};
use crate::models::MachineId;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Bundle file name inside the artifacts directory
const BUNDLE_FILE: &str = "bundle.json";
/// Sequence failure classifier
const SEQUENCE_MODEL_FILE: &str = "failure_model.onnx";
/// Binary downtime-risk classifier
const RISK_MODEL_FILE: &str = "downtime_risk_model.onnx";
/// Directory of per-machine RUL regressors (`machine_<id>.onnx`)
const RUL_MODEL_DIR: &str = "rul";

/// Inference latency target before a warning is logged
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn load_plan(path: &Path, input_shape: &[usize]) -> Result<TractModel, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let to_load_err = |e: TractError| ArtifactError::ModelLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    tract_onnx::onnx()
        .model_for_read(&mut std::io::Cursor::new(bytes))
        .map_err(to_load_err)?
        .with_input_fact(0, f32::fact(input_shape.to_vec()).into())
        .map_err(to_load_err)?
        .into_optimized()
        .map_err(to_load_err)?
        .into_runnable()
        .map_err(to_load_err)
}

fn run_plan(plan: &TractModel, input: Tensor) -> Result<Vec<f32>, PredictionError> {
    let start = Instant::now();
    let outputs = plan
        .run(tvec!(input.into()))
        .map_err(|e| PredictionError::Inference(e.to_string()))?;
    let elapsed = start.elapsed();
    if elapsed.as_millis() > MAX_INFERENCE_MS {
        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Inference exceeded {}ms target", MAX_INFERENCE_MS
        );
    } else {
        debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");
    }

    let output = outputs
        .first()
        .ok_or_else(|| PredictionError::BadOutput("model produced no outputs".into()))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| PredictionError::BadOutput(e.to_string()))?;
    Ok(view.iter().copied().collect())
}

/// Sequence classifier over a `[1, seq_length, n_features]` input
pub struct OnnxSequenceClassifier {
    plan: TractModel,
    seq_length: usize,
    n_features: usize,
}

impl OnnxSequenceClassifier {
    pub fn load(path: &Path, seq_length: usize, n_features: usize) -> Result<Self, ArtifactError> {
        let plan = load_plan(path, &[1, seq_length, n_features])?;
        Ok(Self {
            plan,
            seq_length,
            n_features,
        })
    }
}

impl SequenceModel for OnnxSequenceClassifier {
    fn class_scores(&self, window: &[Vec<f32>]) -> Result<Vec<f32>, PredictionError> {
        if window.len() != self.seq_length {
            return Err(PredictionError::Inference(format!(
                "window has {} rows, model expects {}",
                window.len(),
                self.seq_length
            )));
        }
        let mut data = Vec::with_capacity(self.seq_length * self.n_features);
        for row in window {
            if row.len() != self.n_features {
                return Err(PredictionError::Inference(format!(
                    "feature row has {} columns, model expects {}",
                    row.len(),
                    self.n_features
                )));
            }
            data.extend_from_slice(row);
        }
        let input =
            tract_ndarray::Array3::from_shape_vec((1, self.seq_length, self.n_features), data)
                .map_err(|e| PredictionError::Inference(e.to_string()))?
                .into();
        run_plan(&self.plan, input)
    }
}

/// Single-machine RUL regressor over a `[1, n_features]` input
pub struct OnnxRegressor {
    plan: TractModel,
    n_features: usize,
}

impl OnnxRegressor {
    pub fn load(path: &Path, n_features: usize) -> Result<Self, ArtifactError> {
        let plan = load_plan(path, &[1, n_features])?;
        Ok(Self { plan, n_features })
    }
}

impl RegressionModel for OnnxRegressor {
    fn predict(&self, features: &[f32]) -> Result<f32, PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError::Inference(format!(
                "feature vector has {} columns, model expects {}",
                features.len(),
                self.n_features
            )));
        }
        let input = tract_ndarray::Array2::from_shape_vec((1, self.n_features), features.to_vec())
            .map_err(|e| PredictionError::Inference(e.to_string()))?
            .into();
        let values = run_plan(&self.plan, input)?;
        values
            .first()
            .copied()
            .ok_or_else(|| PredictionError::BadOutput("regressor output empty".into()))
    }
}

/// Binary risk classifier over a `[1, 2]` input of temperature and vibration
pub struct OnnxRiskClassifier {
    plan: TractModel,
}

impl OnnxRiskClassifier {
    /// Decision threshold on the positive-class score
    const THRESHOLD: f32 = 0.5;

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let plan = load_plan(path, &[1, 2])?;
        Ok(Self { plan })
    }
}

impl RiskModel for OnnxRiskClassifier {
    fn predict(&self, temperature: f32, vibration: f32) -> Result<u8, PredictionError> {
        let input = tract_ndarray::Array2::from_shape_vec((1, 2), vec![temperature, vibration])
            .map_err(|e| PredictionError::Inference(e.to_string()))?
            .into();
        let values = run_plan(&self.plan, input)?;
        // Single-output models emit the positive-class score; two-output
        // models emit one score per class.
        let score = match values.as_slice() {
            [] => return Err(PredictionError::BadOutput("risk output empty".into())),
            [score] => *score,
            [_, positive, ..] => *positive,
        };
        Ok(u8::from(score >= Self::THRESHOLD))
    }
}

impl ModelBank {
    /// Load all artifacts from a directory for the given roster.
    ///
    /// Layout: `bundle.json`, `failure_model.onnx`,
    /// `downtime_risk_model.onnx`, and `rul/machine_<id>.onnx` for every
    /// roster member. Any missing or malformed artifact fails the load;
    /// the process must not start serving ticks without a complete bank.
    pub fn load(dir: &Path, roster: &[MachineId]) -> Result<Self, ArtifactError> {
        if !dir.is_dir() {
            return Err(ArtifactError::NotFound(dir.display().to_string()));
        }
        let bundle = ModelBundle::from_file(&dir.join(BUNDLE_FILE))?;

        let sequence = OnnxSequenceClassifier::load(
            &dir.join(SEQUENCE_MODEL_FILE),
            bundle.seq_length,
            bundle.feature_count(),
        )?;
        let risk = OnnxRiskClassifier::load(&dir.join(RISK_MODEL_FILE))?;

        let rul_dir = dir.join(RUL_MODEL_DIR);
        let n_sensor = bundle.sensor_cols.len();
        let mut regressors: HashMap<MachineId, RulEntry> = HashMap::with_capacity(roster.len());
        for &id in roster {
            let path = rul_dir.join(format!("machine_{}.onnx", id));
            let model = OnnxRegressor::load(&path, n_sensor)?;
            regressors.insert(
                id,
                RulEntry {
                    model: Box::new(model),
                    scaler: bundle.rul_scalers.get(&id).cloned(),
                },
            );
        }

        info!(
            artifacts = %dir.display(),
            machines = roster.len(),
            seq_length = bundle.seq_length,
            classes = bundle.label_encoder.len(),
            "Model bank loaded"
        );

        Ok(ModelBank::new(
            bundle,
            Box::new(sequence),
            regressors,
            Box::new(risk),
        ))
    }
}
