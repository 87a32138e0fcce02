//! Feedback service wrapping a generator with top-N selection and a
//! timeout.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use swing_analysis::SwingAnalysisResult;

use crate::agent::{
    CoachingFeedback, FaultSummary, FeedbackError, FeedbackGenerator, FeedbackRequest,
    FeedbackResult, SkillLevel,
};
use crate::coach::TemplateCoach;

/// Feedback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Faults passed to the generator, most severe first
    pub top_n: usize,
    /// Generator timeout in milliseconds
    pub timeout_ms: u64,
    /// Skill level used when a caller supplies none
    pub default_skill_level: SkillLevel,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            timeout_ms: 2_000,
            default_skill_level: SkillLevel::Intermediate,
        }
    }
}

/// An analysis result with optional coaching feedback attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedAnalysis {
    #[serde(flatten)]
    pub result: SwingAnalysisResult,
    pub feedback: Option<CoachingFeedback>,
}

pub struct FeedbackService {
    generator: Arc<dyn FeedbackGenerator>,
    config: FeedbackConfig,
}

impl FeedbackService {
    pub fn new(generator: Arc<dyn FeedbackGenerator>, config: FeedbackConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Build the generator input from the most severe faults
    pub fn request_for(
        &self,
        result: &SwingAnalysisResult,
        skill_level: Option<SkillLevel>,
    ) -> FeedbackRequest {
        FeedbackRequest {
            session_id: result.session_id,
            club: result.club,
            skill_level: skill_level.unwrap_or(self.config.default_skill_level),
            faults: result
                .top_faults(self.config.top_n)
                .iter()
                .map(FaultSummary::from)
                .collect(),
        }
    }

    /// Run the generator under the configured timeout
    pub async fn try_feedback(
        &self,
        result: &SwingAnalysisResult,
        skill_level: Option<SkillLevel>,
    ) -> FeedbackResult<CoachingFeedback> {
        let request = self.request_for(result, skill_level);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, self.generator.generate(&request)).await {
            Ok(feedback) => feedback,
            Err(_) => Err(FeedbackError::Timeout(self.config.timeout_ms)),
        }
    }

    /// Feedback for a result, or `None` when generation fails
    pub async fn feedback_for(
        &self,
        result: &SwingAnalysisResult,
        skill_level: Option<SkillLevel>,
    ) -> Option<CoachingFeedback> {
        match self.try_feedback(result, skill_level).await {
            Ok(feedback) => Some(feedback),
            Err(e) => {
                tracing::warn!(
                    session = %result.session_id,
                    generator = self.generator.name(),
                    error = %e,
                    "Feedback generation failed"
                );
                None
            }
        }
    }

    /// Attach feedback to a result; the result itself is never altered
    pub async fn annotate(
        &self,
        result: SwingAnalysisResult,
        skill_level: Option<SkillLevel>,
    ) -> AnnotatedAnalysis {
        let feedback = self.feedback_for(&result, skill_level).await;
        AnnotatedAnalysis { result, feedback }
    }
}

impl Default for FeedbackService {
    fn default() -> Self {
        Self::new(Arc::new(TemplateCoach::new()), FeedbackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use swing_analysis::{AnalysisPipeline, AnalysisRequest};
    use swing_core::synthetic::{BodyPose, SyntheticSwing};

    struct FailingCoach;

    #[async_trait]
    impl FeedbackGenerator for FailingCoach {
        fn name(&self) -> &str {
            "FailingCoach"
        }

        async fn generate(&self, _request: &FeedbackRequest) -> FeedbackResult<CoachingFeedback> {
            Err(FeedbackError::Unavailable)
        }
    }

    struct StalledCoach;

    #[async_trait]
    impl FeedbackGenerator for StalledCoach {
        fn name(&self) -> &str {
            "StalledCoach"
        }

        async fn generate(&self, _request: &FeedbackRequest) -> FeedbackResult<CoachingFeedback> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(FeedbackError::Unavailable)
        }
    }

    fn faulty_result() -> SwingAnalysisResult {
        let swing = SyntheticSwing::default()
            .with_top(BodyPose {
                wrist_extension: 25.0,
                shoulder_turn: 70.0,
                ..BodyPose::top()
            })
            .with_impact(BodyPose {
                pelvis_shift: 0.0,
                ..BodyPose::impact()
            });
        AnalysisPipeline::default()
            .analyze(AnalysisRequest::new("7 Iron", swing.frames(), 60.0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_top_n_selection() {
        let result = faulty_result();
        assert!(result.faults.len() > 3, "{:#?}", result.faults);

        let service = FeedbackService::default();
        let request = service.request_for(&result, None);
        assert_eq!(request.faults.len(), 3);
        assert_eq!(request.faults[0].feedback_key, result.faults[0].feedback_key);
        assert_eq!(request.skill_level, SkillLevel::Intermediate);

        let feedback = service.feedback_for(&result, Some(SkillLevel::Beginner)).await.unwrap();
        assert_eq!(feedback.tips.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_result() {
        let result = faulty_result();
        let service = FeedbackService::new(Arc::new(FailingCoach), FeedbackConfig::default());
        let annotated = service.annotate(result.clone(), None).await;
        assert!(annotated.feedback.is_none());
        assert_eq!(annotated.result, result);
    }

    #[tokio::test]
    async fn test_timeout() {
        let service = FeedbackService::new(
            Arc::new(StalledCoach),
            FeedbackConfig {
                timeout_ms: 20,
                ..Default::default()
            },
        );
        let err = service.try_feedback(&faulty_result(), None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Timeout(20)));
    }
}
