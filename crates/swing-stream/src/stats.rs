//! Session statistics.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swing_analysis::MovingAverageFilter;
use swing_core::{SessionId, SessionState};

/// Snapshot of a session's counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    pub state: SessionState,
    pub frames_received: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    /// Frames evicted from the buffer before any analysis saw them
    pub frames_dropped: u64,
    pub analyses_run: u64,
    /// Stride boundaries reached while an analysis was in flight
    pub analyses_skipped: u64,
    pub faults_detected: u64,
    pub alerts_emitted: u64,
    /// Events discarded because the consumer fell behind
    pub events_dropped: u64,
    pub avg_latency_ms: f64,
    pub last_latency_ms: f64,
    pub effective_stride: usize,
    pub buffered_frames: usize,
    pub last_analyzed_frame: Option<u64>,
}

impl SessionStats {
    pub fn new(session_id: SessionId, stride: usize) -> Self {
        Self {
            session_id,
            state: SessionState::Created,
            frames_received: 0,
            frames_accepted: 0,
            frames_rejected: 0,
            frames_dropped: 0,
            analyses_run: 0,
            analyses_skipped: 0,
            faults_detected: 0,
            alerts_emitted: 0,
            events_dropped: 0,
            avg_latency_ms: 0.0,
            last_latency_ms: 0.0,
            effective_stride: stride,
            buffered_frames: 0,
            last_analyzed_frame: None,
        }
    }
}

/// Windowed average of analysis latency
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    filter: MovingAverageFilter,
    average_ms: f64,
    last: Duration,
}

impl LatencyTracker {
    pub fn new(window: usize) -> Self {
        Self {
            filter: MovingAverageFilter::new(window),
            average_ms: 0.0,
            last: Duration::ZERO,
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.last = latency;
        self.average_ms = self.filter.filter(latency.as_secs_f64() * 1_000.0);
    }

    pub fn average_ms(&self) -> f64 {
        self.average_ms
    }

    pub fn last(&self) -> Duration {
        self.last
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_window() {
        let mut tracker = LatencyTracker::new(2);
        tracker.record(Duration::from_millis(10));
        tracker.record(Duration::from_millis(20));
        tracker.record(Duration::from_millis(40));
        assert!((tracker.average_ms() - 30.0).abs() < 1e-9);
        assert_eq!(tracker.last(), Duration::from_millis(40));
    }
}
