//! WebSocket wire protocol.
//!
//! Every message is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};
use swing_core::{ClubClassification, Error, Handedness, PoseFrame, SessionId, UserId};
use swing_stream::{SessionConfig, SessionEvent, SessionOverrides, SessionStats};

use crate::error::classify_error;

/// Client → server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        #[serde(default)]
        user_id: Option<UserId>,
        club: String,
        #[serde(default)]
        handedness: Handedness,
        #[serde(default)]
        overrides: SessionOverrides,
    },
    Frame {
        frame: PoseFrame,
    },
    Frames {
        frames: Vec<PoseFrame>,
    },
    End,
    Cancel,
    Stats,
}

/// Server → client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionStarted {
        session_id: SessionId,
        club: ClubClassification,
        config: SessionConfig,
    },
    /// Session output: results, alerts, rejections, lifecycle
    Event(SessionEvent),
    Stats {
        stats: SessionStats,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&Error> for ServerMessage {
    fn from(e: &Error) -> Self {
        let (_, code) = classify_error(e);
        ServerMessage::error(code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::SessionState;

    #[test]
    fn test_parse_client_messages() {
        let start: ClientMessage = serde_json::from_str(
            r#"{"type":"start","club":"7 Iron","overrides":{"stride":2}}"#,
        )
        .unwrap();
        match start {
            ClientMessage::Start {
                club,
                handedness,
                overrides,
                user_id,
            } => {
                assert_eq!(club, "7 Iron");
                assert_eq!(handedness, Handedness::Right);
                assert_eq!(overrides.stride, Some(2));
                assert!(user_id.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let end: ClientMessage = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert!(matches!(end, ClientMessage::End));
    }

    #[test]
    fn test_event_envelope() {
        let message = ServerMessage::Event(SessionEvent::StateChanged {
            session_id: SessionId::new(),
            from: SessionState::Active,
            to: SessionState::Draining,
        });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "state_changed");
        assert_eq!(json["to"], "draining");
    }

    #[test]
    fn test_error_message() {
        let message = ServerMessage::from(&Error::SessionNotFound(SessionId::new()));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "session_not_found");
    }
}
