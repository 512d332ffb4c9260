//! Tick scheduling loop
//!
//! Drives fleet evaluations from a wall-clock timer, decoupling the
//! pipeline from any presentation refresh mechanism. Ticks never overlap;
//! a tick that overruns the interval simply delays the next one (missed
//! ticks are dropped, not queued). The run/stop toggle and interval
//! changes take effect at tick boundaries.

use crate::engine::EvaluationEngine;
use crate::models::{
    FleetSnapshot, MachineEvaluation, MachineId, MaintenanceEvent, ManualPrediction, SensorReading,
};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::sampler::SensorSampler;
use crate::session::MonitoringSession;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Default refresh interval between fleet ticks
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the tick scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Initial interval between fleet ticks
    pub interval: Duration,
    /// Lower bound for operator interval adjustments
    pub min_interval: Duration,
    /// Upper bound for operator interval adjustments
    pub max_interval: Duration,
    /// Whether the timer loop starts evaluating immediately
    pub start_running: bool,
    /// Snapshot channel capacity
    pub channel_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            start_running: false,
            channel_size: 16,
        }
    }
}

/// Scheduler statistics
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub running: bool,
    pub interval: Duration,
    pub machines: usize,
}

/// Timer-driven fleet evaluation scheduler
pub struct TickScheduler {
    engine: EvaluationEngine,
    session: RwLock<MonitoringSession>,
    sampler: Box<dyn SensorSampler>,
    config: SchedulerConfig,
    interval_ms: AtomicU64,
    running: AtomicBool,
    tick_count: AtomicU64,
    snapshot_tx: mpsc::Sender<FleetSnapshot>,
    latest: RwLock<Option<FleetSnapshot>>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl TickScheduler {
    pub fn new(
        engine: EvaluationEngine,
        session: MonitoringSession,
        sampler: Box<dyn SensorSampler>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::Receiver<FleetSnapshot>) {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.channel_size);
        let initial = config
            .interval
            .clamp(config.min_interval, config.max_interval);

        let metrics = MonitorMetrics::new();
        metrics.set_machines_monitored(session.roster().len() as i64);

        let scheduler = Self {
            engine,
            interval_ms: AtomicU64::new(initial.as_millis() as u64),
            running: AtomicBool::new(config.start_running),
            tick_count: AtomicU64::new(0),
            session: RwLock::new(session),
            sampler,
            config,
            snapshot_tx,
            latest: RwLock::new(None),
            metrics,
            logger: StructuredLogger::new("tick-scheduler"),
        };
        (scheduler, snapshot_rx)
    }

    /// Run the timer loop until shutdown.
    ///
    /// A tick error is a programming error (unknown roster machine) and
    /// stops the loop; per-machine prediction failures never surface here.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval().as_secs(),
            running = self.is_running(),
            "Starting tick scheduler"
        );

        let mut current = self.interval();
        let mut ticker = interval(current);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_running() {
                        if let Err(e) = self.tick().await {
                            error!(error = %e, "Fleet tick failed, stopping scheduler");
                            break;
                        }
                    }
                    // Pick up operator interval changes at the boundary
                    let desired = self.interval();
                    if desired != current {
                        debug!(interval_secs = desired.as_secs(), "Refresh interval changed");
                        current = desired;
                        ticker = interval(current);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down tick scheduler");
                    break;
                }
            }
        }
    }

    /// Evaluate the whole fleet once (timer or manual trigger)
    pub async fn tick(&self) -> Result<FleetSnapshot> {
        let start = Instant::now();
        let snapshot = {
            let mut session = self.session.write().await;
            self.engine
                .evaluate_fleet(&mut session, self.sampler.as_ref())
                .await?
        };
        let elapsed = start.elapsed();

        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.metrics.observe_tick_latency(elapsed.as_secs_f64());
        self.metrics.set_fleet_ready(snapshot.all_ready);
        self.metrics
            .set_event_log_entries(snapshot.events.len() as i64);
        self.logger.log_tick(
            snapshot.evaluations.len(),
            snapshot.flagged_count(),
            snapshot.all_ready,
            elapsed.as_millis() as u64,
        );

        *self.latest.write().await = Some(snapshot.clone());
        // Presentation may lag; drop rather than block the tick loop
        if let Err(e) = self.snapshot_tx.try_send(snapshot.clone()) {
            debug!(error = %e, "Snapshot channel not drained, dropping snapshot");
        }
        Ok(snapshot)
    }

    /// Manual single-machine evaluation (operator machine selector).
    ///
    /// An id outside the roster is an operator input error, reported back
    /// rather than treated as a pipeline fault.
    pub async fn evaluate_one(&self, machine_id: MachineId) -> Result<MachineEvaluation> {
        let mut session = self.session.write().await;
        if !session.contains(machine_id) {
            anyhow::bail!("machine {} is not in the roster", machine_id);
        }
        self.engine
            .evaluate_machine(&mut session, self.sampler.as_ref(), machine_id)
            .await
    }

    /// Predict from an operator-supplied reading, without touching any
    /// buffer or the event log
    pub async fn predict_manual(
        &self,
        machine_id: MachineId,
        reading: &SensorReading,
    ) -> Result<ManualPrediction> {
        let session = self.session.read().await;
        if !session.contains(machine_id) {
            anyhow::bail!("machine {} is not in the roster", machine_id);
        }
        Ok(self.engine.predict_manual(machine_id, reading)?)
    }

    /// Operator reset: clear every sequence buffer and the event log
    pub async fn reset(&self) {
        self.session.write().await.reset();
        self.metrics.set_event_log_entries(0);
        self.metrics.set_fleet_ready(false);
        self.logger.log_reset();
    }

    /// Adjust the refresh interval, clamped to the configured bounds.
    /// Returns the effective interval.
    pub fn set_interval(&self, requested: Duration) -> Duration {
        let effective = requested.clamp(self.config.min_interval, self.config.max_interval);
        self.interval_ms
            .store(effective.as_millis() as u64, Ordering::Relaxed);
        info!(
            requested_secs = requested.as_secs(),
            effective_secs = effective.as_secs(),
            "Refresh interval updated"
        );
        effective
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Toggle the timer loop; takes effect at the next tick boundary
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
        info!(running, "Run toggle changed");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Most recent fleet snapshot, if any tick has completed
    pub async fn latest_snapshot(&self) -> Option<FleetSnapshot> {
        self.latest.read().await.clone()
    }

    /// Current rolling maintenance-event log
    pub async fn recent_events(&self) -> Vec<MaintenanceEvent> {
        self.session.read().await.recent_events()
    }

    pub async fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.tick_count.load(Ordering::Relaxed),
            running: self.is_running(),
            interval: self.interval(),
            machines: self.session.read().await.roster().len(),
        }
    }
}
