//! Per-machine, per-tick evaluation
//!
//! Composes one `MachineEvaluation` from the machine's buffer state and
//! the model bank's outputs, and applies the maintenance decision rule.
//! Prediction failures are recovered per field as visible `None` sentinels;
//! an unknown machine id is the one fatal exception, since the roster is
//! fixed at load time.

use crate::bank::ModelBank;
use crate::error::PredictionError;
use crate::models::{
    FleetSnapshot, MachineEvaluation, MachineId, MaintenanceEvent, ManualPrediction, SensorReading,
    NORMAL_LABEL, RUL_THRESHOLD_HOURS,
};
use crate::observability::MonitorMetrics;
use crate::sampler::SensorSampler;
use crate::session::MonitoringSession;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// The system's one business rule.
///
/// The full window is the authoritative gatekeeper for the boolean alarm:
/// a short window forces `false` even though RUL and risk were still
/// computed for display. An unavailable prediction contributes false to
/// its term, so a failed classification never raises the alarm by itself;
/// the operator sees the sentinel instead of a verdict.
pub fn maintenance_required(
    window_full: bool,
    rul: Option<f32>,
    risk: Option<u8>,
    failure_type: Option<&str>,
) -> bool {
    let rul_low = rul.is_some_and(|hours| hours <= RUL_THRESHOLD_HOURS);
    let high_risk = risk == Some(1);
    let abnormal = failure_type.is_some_and(|label| label != NORMAL_LABEL);
    window_full && (rul_low || high_risk || abnormal)
}

/// Orchestrates buffer updates, predictions, and the decision rule
pub struct EvaluationEngine {
    bank: Arc<ModelBank>,
    metrics: MonitorMetrics,
}

impl EvaluationEngine {
    pub fn new(bank: Arc<ModelBank>) -> Self {
        Self {
            bank,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn bank(&self) -> &ModelBank {
        &self.bank
    }

    /// Sample, buffer, and evaluate a single machine (manual mode)
    pub async fn evaluate_machine(
        &self,
        session: &mut MonitoringSession,
        sampler: &dyn SensorSampler,
        machine_id: MachineId,
    ) -> Result<MachineEvaluation> {
        let reading = sampler.sample(machine_id).await?;
        let buffer = session
            .buffer_mut(machine_id)
            .ok_or(PredictionError::UnknownMachine(machine_id))?;
        buffer.push(reading);
        Ok(self.evaluate_buffered(session, machine_id)?)
    }

    /// Predict from an operator-supplied reading, bypassing the buffer.
    ///
    /// Only the risk classifier and the machine's RUL regressor run; there
    /// is no sequence window involved, so the alarm has no window gate.
    pub fn predict_manual(
        &self,
        machine_id: MachineId,
        reading: &SensorReading,
    ) -> Result<ManualPrediction, PredictionError> {
        let downtime_risk =
            self.recover(machine_id, "downtime_risk", self.bank.predict_risk(reading))?;
        let predicted_rul = self.recover(
            machine_id,
            "predicted_rul",
            self.bank.predict_rul(machine_id, reading),
        )?;

        let required = predicted_rul.is_some_and(|hours| hours <= RUL_THRESHOLD_HOURS)
            || downtime_risk == Some(1);
        self.metrics.inc_evaluations();

        Ok(ManualPrediction {
            machine_id,
            predicted_rul,
            downtime_risk,
            maintenance_required: required,
        })
    }

    /// Evaluate the whole roster under the same per-machine procedure.
    ///
    /// Machines are visited in roster (id) order so the result assembly is
    /// deterministic. A sampler or predictor failure on one machine never
    /// blocks the rest of the fleet, and every roster machine gets a row:
    /// one with no buffered data at all yields an all-sentinel row.
    pub async fn evaluate_fleet(
        &self,
        session: &mut MonitoringSession,
        sampler: &dyn SensorSampler,
    ) -> Result<FleetSnapshot> {
        let roster = session.roster().to_vec();
        let mut evaluations = Vec::with_capacity(roster.len());

        for machine_id in roster {
            match sampler.sample(machine_id).await {
                Ok(reading) => {
                    if let Some(buffer) = session.buffer_mut(machine_id) {
                        buffer.push(reading);
                    }
                }
                Err(e) => {
                    warn!(machine_id, error = %e, "Sampler failed, evaluating from buffered state");
                }
            }
            let has_data = session
                .buffer(machine_id)
                .is_some_and(|b| !b.is_empty());
            if !has_data {
                warn!(machine_id, "No readings available, emitting sentinel row");
                evaluations.push(MachineEvaluation {
                    machine_id,
                    predicted_rul: None,
                    downtime_risk: None,
                    failure_type: None,
                    maintenance_required: false,
                    window_full: false,
                    latest_reading: None,
                });
                continue;
            }
            evaluations.push(self.evaluate_buffered(session, machine_id)?);
        }

        let all_ready = session.all_ready();
        if !all_ready {
            debug!("Fleet not ready: at least one sequence window is short");
        }

        Ok(FleetSnapshot {
            evaluated_at: Utc::now(),
            evaluations,
            all_ready,
            events: session.recent_events(),
        })
    }

    /// Evaluate a machine from its current buffer contents
    fn evaluate_buffered(
        &self,
        session: &mut MonitoringSession,
        machine_id: MachineId,
    ) -> Result<MachineEvaluation, PredictionError> {
        let buffer = session
            .buffer(machine_id)
            .ok_or(PredictionError::UnknownMachine(machine_id))?;
        let window = buffer.window_vec();
        let window_full = buffer.is_full();
        let latest = window
            .last()
            .cloned()
            .ok_or_else(|| PredictionError::Inference("evaluating an empty buffer".into()))?;

        // Risk and RUL are always attempted, regardless of readiness
        let downtime_risk =
            self.recover(machine_id, "downtime_risk", self.bank.predict_risk(&latest))?;
        let predicted_rul = self.recover(
            machine_id,
            "predicted_rul",
            self.bank.predict_rul(machine_id, &latest),
        )?;

        // The sequence classifier only runs on a full window
        let failure_type = if window_full {
            self.recover(
                machine_id,
                "failure_type",
                self.bank.predict_sequence(&window),
            )?
        } else {
            None
        };

        let required = maintenance_required(
            window_full,
            predicted_rul,
            downtime_risk,
            failure_type.as_deref(),
        );

        let evaluation = MachineEvaluation {
            machine_id,
            predicted_rul,
            downtime_risk,
            failure_type,
            maintenance_required: required,
            window_full,
            latest_reading: Some(latest),
        };

        if required {
            session.record_event(MaintenanceEvent {
                timestamp: Utc::now(),
                machine_id,
                failure_type: evaluation.failure_type.clone(),
                downtime_risk: evaluation.downtime_risk,
                predicted_rul: evaluation.predicted_rul,
            });
            warn!(
                machine_id,
                failure_type = evaluation.failure_type_display(),
                risk = ?evaluation.downtime_risk,
                rul_hours = ?evaluation.predicted_rul,
                "Maintenance required"
            );
            self.metrics.inc_maintenance_flags();
        }
        self.metrics.inc_evaluations();

        Ok(evaluation)
    }

    /// Turn a prediction result into a visible sentinel, letting only
    /// fatal errors escape
    fn recover<T>(
        &self,
        machine_id: MachineId,
        field: &str,
        result: Result<T, PredictionError>,
    ) -> Result<Option<T>, PredictionError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(machine_id, field, error = %e, "Prediction failed, substituting sentinel");
                self.metrics.inc_prediction_errors();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::test_support::{
        constant_bank, test_bundle, FailingRul, FixedClassModel, FixedRisk, FixedRul,
    };
    use crate::bank::{RegressionModel, RulEntry};
    use crate::models::SensorReading;
    use crate::sampler::{async_trait, SyntheticSampler};
    use std::collections::HashMap;

    // Decision rule cases

    #[test]
    fn test_rule_all_clear() {
        assert!(!maintenance_required(true, Some(25.0), Some(0), Some("Normal")));
    }

    #[test]
    fn test_rule_high_risk_flags() {
        assert!(maintenance_required(true, Some(25.0), Some(1), Some("Normal")));
    }

    #[test]
    fn test_rule_low_rul_flags() {
        assert!(maintenance_required(true, Some(15.0), Some(0), Some("Normal")));
        // Boundary is inclusive
        assert!(maintenance_required(true, Some(20.0), Some(0), Some("Normal")));
    }

    #[test]
    fn test_rule_abnormal_failure_flags() {
        assert!(maintenance_required(true, Some(25.0), Some(0), Some("Overheat")));
    }

    #[test]
    fn test_rule_failed_classification_suppresses_alarm() {
        // A sentinel failure type never raises the alarm by itself; the
        // operator is shown "cannot judge" rather than a false positive
        assert!(!maintenance_required(true, Some(25.0), Some(0), None));
        // The other terms still fire on their own
        assert!(maintenance_required(true, Some(15.0), Some(0), None));
        assert!(maintenance_required(true, Some(25.0), Some(1), None));
    }

    #[test]
    fn test_rule_short_window_gates_everything() {
        // Even extreme values cannot flag a machine before its window fills
        assert!(!maintenance_required(false, Some(0.0), Some(1), None));
        assert!(!maintenance_required(false, Some(0.0), Some(1), Some("Overheat")));
    }

    #[test]
    fn test_rule_unavailable_rul_and_risk_contribute_false() {
        assert!(!maintenance_required(true, None, None, Some("Normal")));
    }

    // Engine behavior, with constant predictors

    struct StubSampler;

    #[async_trait]
    impl crate::sampler::SensorSampler for StubSampler {
        async fn sample(&self, _machine_id: MachineId) -> anyhow::Result<SensorReading> {
            Ok(SensorReading {
                temperature: 75.0,
                vibration: 50.0,
                pressure: 3.0,
                humidity: 55.0,
                energy_consumption: 2.5,
                delta_minutes: 0.0,
                timestamp: Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn test_fleet_tick_returns_row_per_machine() {
        let bank = Arc::new(constant_bank(
            &(1..=50).collect::<Vec<_>>(),
            1,
            0,
            100.0,
            0,
        ));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(50, 1);

        let snapshot = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();

        assert_eq!(snapshot.evaluations.len(), 50);
        assert!(snapshot.all_ready);
        let ids: Vec<MachineId> = snapshot.evaluations.iter().map(|e| e.machine_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "rows must be assembled in machine-id order");
        assert_eq!(snapshot.flagged_count(), 0);
    }

    #[tokio::test]
    async fn test_all_ready_false_until_every_window_full() {
        let bank = Arc::new(constant_bank(&[1, 2, 3], 2, 0, 100.0, 0));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(3, 2);

        let first = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();
        assert!(!first.all_ready);
        assert!(first.evaluations.iter().all(|e| e.failure_type.is_none()));
        assert!(first.evaluations.iter().all(|e| !e.maintenance_required));
        // RUL and risk are still computed for display
        assert!(first.evaluations.iter().all(|e| e.predicted_rul.is_some()));
        assert!(first.evaluations.iter().all(|e| e.downtime_risk.is_some()));

        let second = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();
        assert!(second.all_ready);
        assert!(second
            .evaluations
            .iter()
            .all(|e| e.failure_type.as_deref() == Some("Normal")));
    }

    #[tokio::test]
    async fn test_gatekeeper_holds_with_extreme_outputs() {
        // RUL 0 and risk 1 would both flag, but the window is short
        let bank = Arc::new(constant_bank(&[1], 3, 2, 0.0, 1));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(1, 3);

        let snapshot = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();
        let row = &snapshot.evaluations[0];
        assert_eq!(row.predicted_rul, Some(0.0));
        assert_eq!(row.downtime_risk, Some(1));
        assert!(!row.maintenance_required);
        assert!(snapshot.events.is_empty());
    }

    #[tokio::test]
    async fn test_event_log_capped_after_repeated_flags() {
        let bank = Arc::new(constant_bank(&[1], 1, 0, 100.0, 1));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(1, 1);

        let mut last = None;
        for _ in 0..8 {
            last = Some(
                engine
                    .evaluate_fleet(&mut session, &StubSampler)
                    .await
                    .unwrap(),
            );
        }
        let snapshot = last.unwrap();
        assert!(snapshot.evaluations[0].maintenance_required);
        assert_eq!(snapshot.events.len(), 5);
    }

    #[tokio::test]
    async fn test_one_failing_regressor_does_not_block_the_fleet() {
        let roster: Vec<MachineId> = (1..=50).collect();
        let regressors: HashMap<MachineId, RulEntry> = roster
            .iter()
            .map(|&id| {
                let model: Box<dyn RegressionModel> = if id == 7 {
                    Box::new(FailingRul)
                } else {
                    Box::new(FixedRul(100.0))
                };
                (id, RulEntry { model, scaler: None })
            })
            .collect();
        let bank = Arc::new(ModelBank::new(
            test_bundle(1),
            Box::new(FixedClassModel(0)),
            regressors,
            Box::new(FixedRisk(0)),
        ));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(50, 1);

        let snapshot = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();

        assert_eq!(snapshot.evaluations.len(), 50);
        for row in &snapshot.evaluations {
            if row.machine_id == 7 {
                assert!(row.predicted_rul.is_none());
            } else {
                assert_eq!(row.predicted_rul, Some(100.0));
            }
        }
    }

    #[tokio::test]
    async fn test_manual_single_machine_evaluation_records_event() {
        let bank = Arc::new(constant_bank(&[1, 2], 1, 0, 5.0, 0));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(2, 1);

        let eval = engine
            .evaluate_machine(&mut session, &StubSampler, 2)
            .await
            .unwrap();
        assert!(eval.maintenance_required, "RUL 5 <= 20 must flag");
        assert_eq!(session.recent_events().len(), 1);
        assert_eq!(session.recent_events()[0].machine_id, 2);
        // Only machine 2 was touched
        assert!(session.buffer(1).unwrap().is_empty());
    }

    struct FailingSampler {
        failing_id: MachineId,
    }

    #[async_trait]
    impl crate::sampler::SensorSampler for FailingSampler {
        async fn sample(&self, machine_id: MachineId) -> anyhow::Result<SensorReading> {
            if machine_id == self.failing_id {
                anyhow::bail!("simulated sampler fault");
            }
            StubSampler.sample(machine_id).await
        }
    }

    #[tokio::test]
    async fn test_sampler_failure_yields_sentinel_row_not_a_gap() {
        let bank = Arc::new(constant_bank(&[1, 2, 3], 1, 0, 100.0, 0));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(3, 1);
        let sampler = FailingSampler { failing_id: 2 };

        let snapshot = engine.evaluate_fleet(&mut session, &sampler).await.unwrap();

        // The fleet shape survives: one row per roster machine
        assert_eq!(snapshot.evaluations.len(), 3);
        let row = &snapshot.evaluations[1];
        assert_eq!(row.machine_id, 2);
        assert!(row.latest_reading.is_none());
        assert!(row.predicted_rul.is_none());
        assert!(row.downtime_risk.is_none());
        assert!(!row.maintenance_required);
        assert!(!snapshot.all_ready);

        // Once its buffer holds data, a later sampler failure falls back
        // to the buffered reading instead of the sentinel row
        let recovered = engine
            .evaluate_fleet(&mut session, &StubSampler)
            .await
            .unwrap();
        assert!(recovered.evaluations[1].latest_reading.is_some());
        let relapse = engine.evaluate_fleet(&mut session, &sampler).await.unwrap();
        assert!(relapse.evaluations[1].latest_reading.is_some());
        assert_eq!(relapse.evaluations[1].predicted_rul, Some(100.0));
    }

    #[tokio::test]
    async fn test_manual_prediction_skips_the_window_gate() {
        // RUL 5 flags immediately even though no buffer was ever filled
        let bank = Arc::new(constant_bank(&[1], 10, 0, 5.0, 0));
        let engine = EvaluationEngine::new(bank);

        let reading = StubSampler.sample(1).await.unwrap();
        let prediction = engine.predict_manual(1, &reading).unwrap();

        assert_eq!(prediction.predicted_rul, Some(5.0));
        assert!(prediction.maintenance_required);
    }

    #[tokio::test]
    async fn test_manual_prediction_flags_on_risk_alone() {
        let bank = Arc::new(constant_bank(&[1], 10, 0, 100.0, 1));
        let engine = EvaluationEngine::new(bank);

        let reading = StubSampler.sample(1).await.unwrap();
        let prediction = engine.predict_manual(1, &reading).unwrap();

        assert_eq!(prediction.downtime_risk, Some(1));
        assert!(prediction.maintenance_required);

        let healthy_bank = Arc::new(constant_bank(&[1], 10, 0, 100.0, 0));
        let healthy = EvaluationEngine::new(healthy_bank)
            .predict_manual(1, &reading)
            .unwrap();
        assert!(!healthy.maintenance_required);
    }

    #[tokio::test]
    async fn test_manual_prediction_unknown_machine_is_fatal() {
        let bank = Arc::new(constant_bank(&[1], 1, 0, 100.0, 0));
        let engine = EvaluationEngine::new(bank);

        let reading = StubSampler.sample(1).await.unwrap();
        assert!(matches!(
            engine.predict_manual(99, &reading),
            Err(PredictionError::UnknownMachine(99))
        ));
    }

    #[tokio::test]
    async fn test_synthetic_sampler_drives_engine() {
        let bank = Arc::new(constant_bank(&[1], 1, 0, 100.0, 0));
        let engine = EvaluationEngine::new(bank);
        let mut session = MonitoringSession::with_machine_count(1, 1);
        let sampler = SyntheticSampler::new(1);

        let snapshot = engine.evaluate_fleet(&mut session, &sampler).await.unwrap();
        assert_eq!(snapshot.evaluations.len(), 1);
    }
}
