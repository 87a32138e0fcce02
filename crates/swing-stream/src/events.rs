//! Events pushed to a session's consumer.

use serde::{Deserialize, Serialize};
use swing_analysis::{DetectedFault, SwingAnalysisResult};
use swing_core::{
    ClubClassification, SessionId, SessionState, Timestamp, UserId, ValidationError,
};

use crate::config::SessionConfig;
use crate::stats::SessionStats;

/// Why a session reached a terminal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CloseReason {
    /// Explicit end-session
    Ended,
    IdleTimeout,
    /// Explicit cancel; no final analysis
    Cancelled,
    TooManyRejections { consecutive: usize },
    AnalysisFailed { message: String },
}

impl CloseReason {
    /// Graceful closes drain the buffer with a final analysis
    pub fn runs_final_analysis(&self) -> bool {
        matches!(self, CloseReason::Ended | CloseReason::IdleTimeout)
    }
}

/// Retained outcome of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub club: ClubClassification,
    pub state: SessionState,
    pub reason: CloseReason,
    pub closed_at: Timestamp,
    pub stats: SessionStats,
    pub final_result: Option<SwingAnalysisResult>,
}

/// Session output channel message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session_id: SessionId,
        club: ClubClassification,
        config: SessionConfig,
    },
    Analysis {
        result: Box<SwingAnalysisResult>,
    },
    FaultAlert {
        session_id: SessionId,
        trailing_frame: Option<u64>,
        fault: Box<DetectedFault>,
    },
    FrameRejected {
        session_id: SessionId,
        error: ValidationError,
    },
    StateChanged {
        session_id: SessionId,
        from: SessionState,
        to: SessionState,
    },
    /// Graceful close (ended, idle or cancelled)
    Closed { record: Box<TerminalRecord> },
    /// Error-forced close
    Errored { record: Box<TerminalRecord> },
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Closed { .. } | SessionEvent::Errored { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = SessionEvent::StateChanged {
            session_id: SessionId::new(),
            from: SessionState::Created,
            to: SessionState::Active,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "state_changed");
        assert_eq!(json["to"], "active");
        assert!(!event.is_terminal());

        let reason = serde_json::to_value(CloseReason::IdleTimeout).unwrap();
        assert_eq!(reason["reason"], "idle_timeout");
    }

    #[test]
    fn test_final_analysis_policy() {
        assert!(CloseReason::Ended.runs_final_analysis());
        assert!(CloseReason::IdleTimeout.runs_final_analysis());
        assert!(!CloseReason::Cancelled.runs_final_analysis());
    }
}
