//! Per-machine rolling sequence buffer
//!
//! Holds the last `capacity` sensor readings for one machine, newest last.
//! Eviction is strict FIFO. The newest entry's `delta_minutes` is derived
//! from the wall-clock gap to the entry that preceded it in the buffer.

use crate::models::SensorReading;
use std::collections::VecDeque;

/// Bounded, ordered buffer of the most recent readings for one machine
#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    readings: VecDeque<SensorReading>,
    capacity: usize,
}

impl SequenceBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sequence buffer capacity must be positive");
        Self {
            readings: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a reading, recomputing its delta from the previous entry and
    /// evicting the oldest entry if the capacity would be exceeded.
    ///
    /// Deltas always describe gaps within the current window: after an
    /// eviction the new oldest entry has no predecessor left, so its delta
    /// is reset to 0 rather than keeping the gap to the evicted entry.
    pub fn push(&mut self, mut reading: SensorReading) {
        reading.delta_minutes = match self.readings.back() {
            Some(prev) => {
                let gap = reading
                    .timestamp
                    .signed_duration_since(prev.timestamp)
                    .num_milliseconds() as f32
                    / 60_000.0;
                gap.max(0.0)
            }
            None => 0.0,
        };
        self.readings.push_back(reading);
        if self.readings.len() > self.capacity {
            self.readings.pop_front();
            if let Some(front) = self.readings.front_mut() {
                front.delta_minutes = 0.0;
            }
        }
    }

    /// Current window, oldest first / newest last
    pub fn window(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// Owned copy of the current window
    pub fn window_vec(&self) -> Vec<SensorReading> {
        self.readings.iter().cloned().collect()
    }

    /// Most recently pushed reading
    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the window holds exactly `capacity` readings
    pub fn is_full(&self) -> bool {
        self.readings.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn reading_at(offset_secs: i64, temperature: f32) -> SensorReading {
        SensorReading {
            temperature,
            vibration: 50.0,
            pressure: 3.0,
            humidity: 55.0,
            energy_consumption: 2.5,
            delta_minutes: 99.0, // overwritten by push
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_capacity_invariant() {
        let mut buf = SequenceBuffer::new(10);
        for i in 0..100 {
            buf.push(reading_at(i, 70.0));
            assert!(buf.len() <= 10);
        }
        assert!(buf.is_full());
    }

    #[test]
    fn test_fifo_eviction_drops_oldest_once() {
        let mut buf = SequenceBuffer::new(5);
        for i in 0..6 {
            buf.push(reading_at(i, 70.0 + i as f32));
        }
        // After capacity + 1 pushes, the oldest surviving reading is the
        // 2nd one ever pushed.
        let oldest = buf.window().next().unwrap();
        assert_eq!(oldest.temperature, 71.0);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_first_reading_delta_is_zero() {
        let mut buf = SequenceBuffer::new(3);
        buf.push(reading_at(0, 70.0));
        assert_eq!(buf.latest().unwrap().delta_minutes, 0.0);
    }

    #[test]
    fn test_delta_minutes_from_timestamp_gap() {
        let mut buf = SequenceBuffer::new(3);
        buf.push(reading_at(0, 70.0));
        buf.push(reading_at(90, 71.0));
        let delta = buf.latest().unwrap().delta_minutes;
        assert!((delta - 1.5).abs() < 1e-4, "delta was {}", delta);
    }

    #[test]
    fn test_oldest_surviving_delta_resets_after_eviction() {
        let mut buf = SequenceBuffer::new(2);
        buf.push(reading_at(0, 70.0));
        buf.push(reading_at(60, 71.0));
        buf.push(reading_at(120, 72.0));

        let deltas: Vec<f32> = buf.window().map(|r| r.delta_minutes).collect();
        // The window's first row has no predecessor inside the window
        assert_eq!(deltas, vec![0.0, 1.0]);
    }

    #[test]
    fn test_delta_clamped_nonnegative_for_out_of_order_timestamps() {
        let mut buf = SequenceBuffer::new(3);
        buf.push(reading_at(60, 70.0));
        buf.push(reading_at(0, 71.0));
        assert_eq!(buf.latest().unwrap().delta_minutes, 0.0);
    }

    #[test]
    fn test_not_full_below_capacity() {
        let mut buf = SequenceBuffer::new(4);
        buf.push(reading_at(0, 70.0));
        buf.push(reading_at(1, 70.0));
        assert!(!buf.is_full());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_clear_empties_window() {
        let mut buf = SequenceBuffer::new(2);
        buf.push(reading_at(0, 70.0));
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.latest().is_none());
    }
}
