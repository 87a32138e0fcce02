//! API error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use swing_core::Error;

/// Server startup failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Status code and stable error code for a core error
pub fn classify_error(error: &Error) -> (StatusCode, &'static str) {
    match error {
        Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
        Error::InsufficientData { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_data"),
        Error::SessionState { .. } | Error::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "session_state")
        }
        Error::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
        Error::SessionLimit { .. } => (StatusCode::SERVICE_UNAVAILABLE, "session_limit"),
        Error::UnknownClub(_) => (StatusCode::BAD_REQUEST, "unknown_club"),
        Error::Config(_) => (StatusCode::BAD_REQUEST, "invalid_config"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        Error::Serialization(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        Error::Analysis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "analysis_failed"),
    }
}

/// Error body returned by REST handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: "internal".to_string(),
                message: message.into(),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let (status, code) = classify_error(&e);
        Self {
            status,
            body: ErrorBody {
                error: code.to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.body.message, "Request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::{SessionId, SessionState};

    #[test]
    fn test_session_errors_map_to_http() {
        let id = SessionId::new();
        let err = ApiError::from(Error::SessionState {
            session_id: id,
            state: SessionState::Closed,
            operation: "accept frames",
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.error, "session_state");
        assert!(err.body.message.contains("closed"));

        let err = ApiError::from(Error::SessionNotFound(id));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
