//! Error types for the swing analysis system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Landmark, SessionId, SessionState};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session {session_id} is {state}; cannot {operation}")]
    SessionState {
        session_id: SessionId,
        state: SessionState,
        operation: &'static str,
    },

    #[error("Illegal session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Unknown session: {0}")]
    SessionNotFound(SessionId),

    #[error("Session limit reached ({limit} active sessions)")]
    SessionLimit { limit: usize },

    #[error("Unrecognized club name: {0:?}")]
    UnknownClub(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need {required} frames, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Analysis task failed: {0}")]
    Analysis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Specific reason a frame or sequence failed validation
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("required landmark missing")]
    MissingLandmark,

    #[error("non-finite coordinate")]
    NonFinite,

    #[error("{axis} coordinate {value:.3} outside [{min:.3}, {max:.3}]")]
    OutOfBounds {
        axis: char,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("visibility {value} outside [0, 1]")]
    VisibilityOutOfRange { value: f64 },

    #[error("landmark moved {distance:.3} between frames (max {max:.3})")]
    Displacement { distance: f64, max: f64 },

    #[error("frame index not increasing (previous {previous})")]
    NonMonotonicIndex { previous: u64 },

    #[error("timestamp {timestamp} precedes previous {previous}")]
    NonMonotonicTimestamp { timestamp: f64, previous: f64 },

    #[error("sequence too short: need {required} frames, have {available}")]
    TooFewFrames { required: usize, available: usize },
}

/// A validation failure with the offending frame and landmark
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{}", describe(.frame_index, .landmark, .failure))]
pub struct ValidationError {
    pub frame_index: Option<u64>,
    pub landmark: Option<Landmark>,
    pub failure: ValidationFailure,
}

impl ValidationError {
    pub fn frame(frame_index: u64, failure: ValidationFailure) -> Self {
        Self {
            frame_index: Some(frame_index),
            landmark: None,
            failure,
        }
    }

    pub fn landmark(frame_index: u64, landmark: Landmark, failure: ValidationFailure) -> Self {
        Self {
            frame_index: Some(frame_index),
            landmark: Some(landmark),
            failure,
        }
    }

    pub fn sequence(failure: ValidationFailure) -> Self {
        Self {
            frame_index: None,
            landmark: None,
            failure,
        }
    }
}

fn describe(
    frame_index: &Option<u64>,
    landmark: &Option<Landmark>,
    failure: &ValidationFailure,
) -> String {
    match (frame_index, landmark) {
        (Some(idx), Some(lm)) => format!("frame {idx}, {lm}: {failure}"),
        (Some(idx), None) => format!("frame {idx}: {failure}"),
        _ => failure.to_string(),
    }
}
