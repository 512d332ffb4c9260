//! Per-session monitoring state
//!
//! Owns everything mutable across ticks: the fixed machine roster, one
//! sequence buffer per machine, and the capped maintenance-event log.
//! Modeled as an explicit object (rather than ambient shared state) so the
//! operator reset action has a single well-defined target.

use crate::buffer::SequenceBuffer;
use crate::models::{MachineId, MaintenanceEvent, EVENT_LOG_CAP};
use std::collections::{HashMap, VecDeque};

pub struct MonitoringSession {
    roster: Vec<MachineId>,
    buffers: HashMap<MachineId, SequenceBuffer>,
    events: VecDeque<MaintenanceEvent>,
    seq_length: usize,
}

impl MonitoringSession {
    /// Create a session with an empty buffer for every roster machine.
    ///
    /// The roster is fixed for the session lifetime; duplicate ids are
    /// collapsed.
    pub fn new(mut roster: Vec<MachineId>, seq_length: usize) -> Self {
        roster.sort_unstable();
        roster.dedup();
        let buffers = roster
            .iter()
            .map(|&id| (id, SequenceBuffer::new(seq_length)))
            .collect();
        Self {
            roster,
            buffers,
            events: VecDeque::with_capacity(EVENT_LOG_CAP + 1),
            seq_length,
        }
    }

    /// Convenience constructor for a 1..=count roster
    pub fn with_machine_count(count: u32, seq_length: usize) -> Self {
        Self::new((1..=count).collect(), seq_length)
    }

    pub fn roster(&self) -> &[MachineId] {
        &self.roster
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    pub fn contains(&self, machine_id: MachineId) -> bool {
        self.buffers.contains_key(&machine_id)
    }

    pub fn buffer(&self, machine_id: MachineId) -> Option<&SequenceBuffer> {
        self.buffers.get(&machine_id)
    }

    pub fn buffer_mut(&mut self, machine_id: MachineId) -> Option<&mut SequenceBuffer> {
        self.buffers.get_mut(&machine_id)
    }

    /// Append to the rolling event log, dropping the oldest entry beyond
    /// the cap (same FIFO discipline as the sequence buffers).
    pub fn record_event(&mut self, event: MaintenanceEvent) {
        self.events.push_back(event);
        while self.events.len() > EVENT_LOG_CAP {
            self.events.pop_front();
        }
    }

    /// Current event log, oldest first
    pub fn recent_events(&self) -> Vec<MaintenanceEvent> {
        self.events.iter().cloned().collect()
    }

    /// True iff every machine's window is full
    pub fn all_ready(&self) -> bool {
        self.buffers.values().all(SequenceBuffer::is_full)
    }

    /// Operator reset: clear every buffer and the event log
    pub fn reset(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.clear();
        }
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorReading;
    use chrono::Utc;

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

    fn event(machine_id: MachineId) -> MaintenanceEvent {
        MaintenanceEvent {
            timestamp: Utc::now(),
            machine_id,
            failure_type: Some("Overheat".into()),
            downtime_risk: Some(1),
            predicted_rul: Some(4.0),
        }
    }

    #[test]
    fn test_session_creates_buffer_per_machine() {
        let session = MonitoringSession::with_machine_count(50, 10);
        assert_eq!(session.roster().len(), 50);
        assert!(session.contains(1));
        assert!(session.contains(50));
        assert!(!session.contains(51));
    }

    #[test]
    fn test_all_ready_requires_every_buffer_full() {
        let mut session = MonitoringSession::with_machine_count(3, 2);
        for id in 1..=3 {
            session.buffer_mut(id).unwrap().push(reading());
            session.buffer_mut(id).unwrap().push(reading());
        }
        assert!(session.all_ready());

        session.buffer_mut(2).unwrap().clear();
        assert!(!session.all_ready());
    }

    #[test]
    fn test_event_log_capped_at_five_most_recent() {
        let mut session = MonitoringSession::with_machine_count(1, 1);
        for id in 1..=8 {
            session.record_event(event(id));
        }
        let events = session.recent_events();
        assert_eq!(events.len(), EVENT_LOG_CAP);
        let ids: Vec<MachineId> = events.iter().map(|e| e.machine_id).collect();
        assert_eq!(ids, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_reset_clears_buffers_and_events() {
        let mut session = MonitoringSession::with_machine_count(2, 3);
        session.buffer_mut(1).unwrap().push(reading());
        session.record_event(event(1));

        session.reset();

        assert!(session.buffer(1).unwrap().is_empty());
        assert!(session.recent_events().is_empty());
        // Roster survives reset
        assert_eq!(session.roster(), &[1, 2]);
    }

    #[test]
    fn test_duplicate_roster_ids_collapsed() {
        let session = MonitoringSession::new(vec![3, 1, 3, 2], 1);
        assert_eq!(session.roster(), &[1, 2, 3]);
    }
}
