//! Shared application state.

use std::sync::Arc;
use std::time::Instant;
use swing_analysis::AnalysisPipeline;
use swing_feedback::{FeedbackGenerator, FeedbackService, TemplateCoach};
use swing_stream::SessionManager;

use crate::config::ApiConfig;

pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<AnalysisPipeline>,
    pub sessions: Arc<SessionManager>,
    pub feedback: Arc<FeedbackService>,
    pub started_at: Instant,
}

impl AppState {
    /// State with the offline template coach
    pub fn new(config: ApiConfig) -> Self {
        Self::with_feedback(config, Arc::new(TemplateCoach::new()))
    }

    pub fn with_feedback(config: ApiConfig, generator: Arc<dyn FeedbackGenerator>) -> Self {
        let pipeline = Arc::new(AnalysisPipeline::new(config.pipeline.clone()));
        let sessions = Arc::new(SessionManager::new(
            config.session_manager_config(),
            pipeline.clone(),
        ));
        let feedback = Arc::new(FeedbackService::new(generator, config.feedback.clone()));

        Self {
            config,
            pipeline,
            sessions,
            feedback,
            started_at: Instant::now(),
        }
    }
}
