//! REST handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swing_analysis::AnalysisRequest;
use swing_core::{ClubClassification, PoseFrame, SessionId};
use swing_feedback::{AnnotatedAnalysis, SkillLevel};
use swing_stream::{FrameOutcome, SessionConfig, SessionStats, StartSession, TerminalRecord};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
    pub uptime_secs: u64,
}

/// Batch request body: the analysis request plus feedback options
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeBody {
    #[serde(flatten)]
    pub request: AnalysisRequest,
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
    #[serde(default = "default_true")]
    pub feedback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub club: ClubClassification,
    pub config: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndParams {
    #[serde(default)]
    pub cancel: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.sessions.registry().active_count().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Run the batch pipeline on the blocking pool, then attach feedback
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnnotatedAnalysis>, ApiError> {
    let AnalyzeBody {
        request,
        skill_level,
        feedback,
    } = body;

    tracing::info!(
        session = %request.session_id,
        club = %request.club_name,
        frames = request.frames.len(),
        "Batch analysis requested"
    );

    let pipeline = Arc::clone(&state.pipeline);
    let result = tokio::task::spawn_blocking(move || pipeline.analyze(request))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let annotated = if feedback {
        state.feedback.annotate(result, skill_level).await
    } else {
        AnnotatedAnalysis {
            result,
            feedback: None,
        }
    };
    Ok(Json(annotated))
}

/// Start a session without an event consumer; results are available
/// from the terminal record
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartSession>,
) -> Result<Json<SessionCreated>, ApiError> {
    let started = state.sessions.start_session(request).await?;
    Ok(Json(SessionCreated {
        session_id: started.session_id,
        club: started.club,
        config: started.config,
    }))
}

pub async fn push_frames(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(frames): Json<Vec<PoseFrame>>,
) -> Result<Json<Vec<FrameOutcome>>, ApiError> {
    let session_id = SessionId(id);
    let mut outcomes = Vec::with_capacity(frames.len());
    for frame in frames {
        outcomes.push(state.sessions.push_frame(session_id, frame).await?);
    }
    Ok(Json(outcomes))
}

pub async fn session_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStats>, ApiError> {
    Ok(Json(state.sessions.session_stats(SessionId(id)).await?))
}

pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<EndParams>,
) -> Result<Json<TerminalRecord>, ApiError> {
    let session_id = SessionId(id);
    let record = if params.cancel {
        state.sessions.cancel_session(session_id).await?
    } else {
        state.sessions.end_session(session_id).await?
    };
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use axum::http::StatusCode;
    use swing_core::synthetic::{BodyPose, SyntheticSwing};
    use swing_core::{ClubType, SessionState};
    use swing_stream::CloseReason;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(ApiConfig::default()))
    }

    #[tokio::test]
    async fn test_analyze_with_feedback() {
        let swing = SyntheticSwing::default().with_top(BodyPose {
            wrist_extension: 25.0,
            ..BodyPose::top()
        });
        let body: AnalyzeBody = serde_json::from_value(serde_json::json!({
            "club_name": "7 Iron",
            "frames": swing.frames(),
            "skill_level": "beginner",
        }))
        .unwrap();

        let Json(annotated) = analyze(State(state()), Json(body)).await.unwrap();
        assert_eq!(annotated.result.club, ClubType::Iron);
        assert!(annotated
            .result
            .faults
            .iter()
            .any(|f| f.feedback_key == "cupped_wrist"));
        let feedback = annotated.feedback.unwrap();
        assert!(feedback.tips.iter().any(|t| t.feedback_key == "cupped_wrist"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_frame_rate() {
        let body: AnalyzeBody = serde_json::from_value(serde_json::json!({
            "club_name": "Driver",
            "frames": SyntheticSwing::default().frames(),
            "frame_rate": -1.0,
        }))
        .unwrap();
        let err = analyze(State(state()), Json(body)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "invalid_input");
    }

    #[tokio::test]
    async fn test_rest_session_flow() {
        let state = state();
        let Json(created) = create_session(
            State(state.clone()),
            Json(StartSession {
                club_name: "Driver".into(),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let id = created.session_id.0;

        let frames = SyntheticSwing::default().truncated(15).frames();
        let Json(outcomes) = push_frames(State(state.clone()), Path(id), Json(frames))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 15);

        let Json(stats) = session_stats(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(stats.frames_accepted, 15);
        assert_eq!(stats.state, SessionState::Active);

        let Json(record) = end_session(State(state.clone()), Path(id), Query(EndParams::default()))
            .await
            .unwrap();
        assert_eq!(record.reason, CloseReason::Ended);
        assert!(record.final_result.is_some());

        let Json(again) = end_session(State(state.clone()), Path(id), Query(EndParams { cancel: true }))
            .await
            .unwrap();
        assert_eq!(again, record);

        let err = push_frames(
            State(state),
            Path(id),
            Json(SyntheticSwing::default().truncated(1).frames()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health(State(state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_sessions, 0);
    }
}
