//! Feedback generator trait and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use swing_analysis::{DetectedFault, MetricKind};
use swing_core::{ClubType, PhaseLabel, SessionId};

/// Result type for feedback operations
pub type FeedbackResult<T> = Result<T, FeedbackError>;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Text generation error: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unparseable response: {0}")]
    Parse(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Feedback service unavailable")]
    Unavailable,
}

/// Player skill level, used to pitch the coaching language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// The parts of a detected fault a coach needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSummary {
    pub fault_name: String,
    pub feedback_key: String,
    pub phase: PhaseLabel,
    pub severity: f64,
    pub metric: Option<MetricKind>,
    pub value: Option<f64>,
    pub ideal_lower: Option<f64>,
    pub ideal_upper: Option<f64>,
}

impl From<&DetectedFault> for FaultSummary {
    fn from(fault: &DetectedFault) -> Self {
        let measurement = fault.measurements.first();
        Self {
            fault_name: fault.fault_name.clone(),
            feedback_key: fault.feedback_key.clone(),
            phase: fault.phase,
            severity: fault.severity,
            metric: measurement.map(|m| m.metric),
            value: measurement.map(|m| m.value),
            ideal_lower: measurement.map(|m| m.ideal_lower),
            ideal_upper: measurement.map(|m| m.ideal_upper),
        }
    }
}

/// Input to a feedback generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: SessionId,
    pub club: ClubType,
    pub skill_level: SkillLevel,
    /// Most severe faults first
    pub faults: Vec<FaultSummary>,
}

/// One piece of coaching advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingTip {
    pub feedback_key: String,
    pub phase: Option<PhaseLabel>,
    pub text: String,
}

/// Coaching text returned by a generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingFeedback {
    /// Generator that produced the feedback
    pub source: String,
    pub summary: String,
    pub tips: Vec<CoachingTip>,
    pub generation_time_ms: u64,
}

impl fmt::Display for CoachingFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.source, self.summary)?;
        for (i, tip) in self.tips.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, tip.text)?;
        }
        Ok(())
    }
}

/// Produces coaching feedback from fault summaries
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &FeedbackRequest) -> FeedbackResult<CoachingFeedback>;

    fn validate_request(&self, request: &FeedbackRequest) -> FeedbackResult<()> {
        match request.faults.iter().find(|f| !(0.0..=1.0).contains(&f.severity)) {
            Some(fault) => Err(FeedbackError::InvalidInput(format!(
                "severity {} of {} outside [0, 1]",
                fault.severity, fault.feedback_key
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_display() {
        let feedback = CoachingFeedback {
            source: "TemplateCoach".to_string(),
            summary: "Two things to work on.".to_string(),
            tips: vec![CoachingTip {
                feedback_key: "cupped_wrist".to_string(),
                phase: Some(PhaseLabel::P4),
                text: "Flatten the lead wrist.".to_string(),
            }],
            generation_time_ms: 0,
        };
        let display = feedback.to_string();
        assert!(display.contains("TemplateCoach"));
        assert!(display.contains("1. Flatten the lead wrist."));
    }

    #[test]
    fn test_skill_level_default() {
        assert_eq!(SkillLevel::default(), SkillLevel::Intermediate);
        assert_eq!(
            serde_json::to_value(SkillLevel::Beginner).unwrap(),
            "beginner"
        );
    }
}
