//! Error taxonomy for the evaluation pipeline
//!
//! Artifact problems are fatal at startup; prediction problems are
//! recovered per-field at evaluation time, with the single exception of an
//! unknown machine id, which indicates a bug in roster handling.

use crate::models::MachineId;
use thiserror::Error;

/// Failure to load or validate model artifacts at startup (fatal)
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
}

/// Failure of a single prediction attempt
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Sequence window shorter than the configured length; non-fatal,
    /// surfaced to the operator as the insufficient-data sentinel
    #[error("sequence window has {got} readings, need {need}")]
    InsufficientWindow { got: usize, need: usize },

    /// Lookup miss against the fixed roster; a programming error, never
    /// substituted with a sentinel
    #[error("no regressor for machine {0}; roster is fixed at load time")]
    UnknownMachine(MachineId),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced unusable output: {0}")]
    BadOutput(String),
}

impl PredictionError {
    /// True for errors the engine must propagate instead of recovering
    pub fn is_fatal(&self) -> bool {
        matches!(self, PredictionError::UnknownMachine(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unknown_machine_is_fatal() {
        assert!(PredictionError::UnknownMachine(7).is_fatal());
        assert!(!PredictionError::InsufficientWindow { got: 3, need: 10 }.is_fatal());
        assert!(!PredictionError::Inference("shape mismatch".into()).is_fatal());
        assert!(!PredictionError::BadOutput("empty tensor".into()).is_fatal());
    }
}
