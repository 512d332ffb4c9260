//! Core library for the fleet maintenance monitor
//!
//! This crate provides the per-machine streaming evaluation pipeline:
//! - Rolling sensor-sequence buffers per machine
//! - A model bank of three heterogeneous predictors (sequence failure
//!   classifier, per-machine RUL regressor, binary downtime-risk classifier)
//! - The evaluation engine and maintenance decision rule
//! - A timer-driven tick scheduler
//! - Health checks and observability

pub mod bank;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod sampler;
pub mod scheduler;
pub mod session;

pub use bank::ModelBank;
pub use buffer::SequenceBuffer;
pub use engine::{maintenance_required, EvaluationEngine};
pub use error::{ArtifactError, PredictionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use sampler::{SensorSampler, SyntheticSampler};
pub use scheduler::{SchedulerConfig, TickScheduler};
pub use session::MonitoringSession;
