//! Prompt templates and a coach backed by an external text service.

use async_trait::async_trait;
use std::time::Instant;

use crate::agent::{
    CoachingFeedback, CoachingTip, FeedbackError, FeedbackGenerator, FeedbackRequest,
    FeedbackResult,
};

/// System prompt for the coaching text service
pub const COACH_SYSTEM_PROMPT: &str = r#"You are an experienced golf instructor. You receive the structured output of a swing analysis: the club, the player's skill level, and the most severe technique faults with the swing phase (P1-P10) and measurement where each was detected.

Your task is to write coaching feedback that:
- Opens with one sentence summarizing the priority
- Gives one tip per fault, most severe first
- Uses language suited to the player's skill level
- Suggests a simple drill where useful

Do not invent faults that are not listed. Format your response as:
Summary: [text]
Tip 1: [text]
Tip 2: [text]"#;

/// Format a feedback request as the user prompt
pub fn format_feedback_request(request: &FeedbackRequest) -> String {
    let faults = if request.faults.is_empty() {
        "No faults detected.".to_string()
    } else {
        request
            .faults
            .iter()
            .enumerate()
            .map(|(i, fault)| {
                let measurement = match (fault.metric, fault.value, fault.ideal_lower, fault.ideal_upper) {
                    (Some(metric), Some(value), Some(lo), Some(hi)) => format!(
                        "{metric} = {value:.1}{unit} (ideal {lo:.1} to {hi:.1})",
                        unit = metric.unit().symbol()
                    ),
                    _ => "no measurement".to_string(),
                };
                format!(
                    "{}. [{}] {} at {}, severity {:.2}; {}",
                    i + 1,
                    fault.feedback_key,
                    fault.fault_name,
                    fault.phase,
                    fault.severity,
                    measurement
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"=== SWING ANALYSIS ===

Club: {}
Skill level: {}

Faults (most severe first):
{}

Please provide coaching feedback for this player."#,
        request.club, request.skill_level, faults
    )
}

/// Parse a `Summary:` / `Tip N:` response into a summary and tip texts
pub fn parse_coaching_response(response: &str) -> Result<(String, Vec<String>), String> {
    let mut summary = None;
    let mut tips = Vec::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("Summary:") {
            summary = Some(rest.trim().to_string());
        } else if trimmed.starts_with("Tip ") {
            if let Some(colon_pos) = trimmed.find(':') {
                let tip = trimmed[colon_pos + 1..].trim();
                if !tip.is_empty() {
                    tips.push(tip.to_string());
                }
            }
        }
    }

    match summary {
        Some(summary) if !summary.is_empty() => Ok((summary, tips)),
        _ => Err("No summary found in response".to_string()),
    }
}

/// External text-generation service
#[async_trait]
pub trait TextService: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> FeedbackResult<String>;
}

/// Coach that delegates wording to a [`TextService`]
pub struct PromptedCoach<S> {
    service: S,
    name: String,
}

impl<S: TextService> PromptedCoach<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            name: "PromptedCoach".to_string(),
        }
    }
}

#[async_trait]
impl<S: TextService> FeedbackGenerator for PromptedCoach<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &FeedbackRequest) -> FeedbackResult<CoachingFeedback> {
        self.validate_request(request)?;
        let started = Instant::now();

        let prompt = format_feedback_request(request);
        let response = self.service.complete(COACH_SYSTEM_PROMPT, &prompt).await?;
        let (summary, texts) = parse_coaching_response(&response).map_err(FeedbackError::Parse)?;

        tracing::debug!(
            coach = %self.name,
            tips = texts.len(),
            faults = request.faults.len(),
            "Parsed coaching response"
        );

        // Tips are matched to faults by position; extra tips carry no key
        let tips = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let fault = request.faults.get(i);
                CoachingTip {
                    feedback_key: fault.map(|f| f.feedback_key.clone()).unwrap_or_default(),
                    phase: fault.map(|f| f.phase),
                    text,
                }
            })
            .collect();

        Ok(CoachingFeedback {
            source: self.name.clone(),
            summary,
            tips,
            generation_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{FaultSummary, SkillLevel};
    use swing_analysis::MetricKind;
    use swing_core::{ClubType, PhaseLabel, SessionId};

    struct CannedService(&'static str);

    #[async_trait]
    impl TextService for CannedService {
        async fn complete(&self, system: &str, prompt: &str) -> FeedbackResult<String> {
            assert_eq!(system, COACH_SYSTEM_PROMPT);
            assert!(prompt.contains("cupped_wrist"));
            Ok(self.0.to_string())
        }
    }

    fn request() -> FeedbackRequest {
        FeedbackRequest {
            session_id: SessionId::new(),
            club: ClubType::Driver,
            skill_level: SkillLevel::Beginner,
            faults: vec![FaultSummary {
                fault_name: "Cupped lead wrist at the top".to_string(),
                feedback_key: "cupped_wrist".to_string(),
                phase: PhaseLabel::P4,
                severity: 0.62,
                metric: Some(MetricKind::LeadWristExtension),
                value: Some(25.0),
                ideal_lower: Some(-5.0),
                ideal_upper: Some(5.0),
            }],
        }
    }

    #[test]
    fn test_format_feedback_request() {
        let prompt = format_feedback_request(&request());
        assert!(prompt.contains("Club: driver"));
        assert!(prompt.contains("Skill level: beginner"));
        assert!(prompt.contains("[cupped_wrist]"));
        assert!(prompt.contains("severity 0.62"));
        assert!(prompt.contains("25.0°"));
    }

    #[test]
    fn test_parse_coaching_response() {
        let response = r#"
Summary: Your wrist position at the top is the priority.
Tip 1: Flatten your lead wrist at the top.
Tip 2: Hold your finish.
        "#;
        let (summary, tips) = parse_coaching_response(response).unwrap();
        assert!(summary.starts_with("Your wrist"));
        assert_eq!(tips.len(), 2);

        assert!(parse_coaching_response("Tip 1: no summary").is_err());
    }

    #[tokio::test]
    async fn test_prompted_coach() {
        let coach = PromptedCoach::new(CannedService(
            "Summary: Fix the wrist.\nTip 1: Flatten it.\nTip 2: Also breathe.",
        ));
        let feedback = coach.generate(&request()).await.unwrap();
        assert_eq!(feedback.source, "PromptedCoach");
        assert_eq!(feedback.tips.len(), 2);
        assert_eq!(feedback.tips[0].feedback_key, "cupped_wrist");
        assert_eq!(feedback.tips[1].phase, None);
    }

    #[tokio::test]
    async fn test_unparseable_reply() {
        let coach = PromptedCoach::new(CannedService("I cannot help with that."));
        assert!(matches!(
            coach.generate(&request()).await,
            Err(FeedbackError::Parse(_))
        ));
    }
}
