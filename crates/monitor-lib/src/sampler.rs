//! Sensor sampling
//!
//! The `SensorSampler` trait is the seam between the evaluation pipeline
//! and whatever produces readings: a real telemetry feed in production, or
//! the synthetic generator below during development and testing.

use crate::models::{MachineId, SensorReading};
use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::sync::Mutex;

pub use async_trait::async_trait;

/// Trait for sensor reading sources
#[async_trait]
pub trait SensorSampler: Send + Sync {
    /// Produce one reading for the given machine.
    ///
    /// `delta_minutes` is recomputed on insertion; samplers may leave it 0.
    async fn sample(&self, machine_id: MachineId) -> Result<SensorReading>;
}

/// Synthetic sampler drawing each field from a fixed independent
/// distribution, matching the telemetry profile the models were trained on.
pub struct SyntheticSampler {
    rng: Mutex<StdRng>,
    temperature: Normal<f32>,
    vibration: Normal<f32>,
}

impl SyntheticSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            // Parameters from the fleet's historical sensor profile
            temperature: Normal::new(75.02, 9.88).expect("valid normal params"),
            vibration: Normal::new(50.0, 14.77).expect("valid normal params"),
        }
    }

    /// Seed from the system entropy source
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }
}

#[async_trait]
impl SensorSampler for SyntheticSampler {
    async fn sample(&self, _machine_id: MachineId) -> Result<SensorReading> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| anyhow::anyhow!("sampler rng poisoned: {}", e))?;

        Ok(SensorReading {
            temperature: self.temperature.sample(&mut *rng),
            vibration: self.vibration.sample(&mut *rng),
            pressure: rng.gen_range(1.0..5.0),
            humidity: rng.gen_range(30.0..80.0),
            energy_consumption: rng.gen_range(0.5..5.0),
            delta_minutes: 0.0,
            timestamp: Utc::now(),
        })
    }
}
