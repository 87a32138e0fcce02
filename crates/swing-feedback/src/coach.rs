//! Deterministic template-based coach.

use async_trait::async_trait;
use std::time::Instant;
use swing_core::ClubType;

use crate::agent::{
    CoachingFeedback, CoachingTip, FaultSummary, FeedbackGenerator, FeedbackRequest,
    FeedbackResult, SkillLevel,
};

/// Advice per feedback key: (cue, drill)
fn advice(feedback_key: &str) -> Option<(&'static str, &'static str)> {
    let advice = match feedback_key {
        "upright_posture" => (
            "Hinge more from the hips at address so your arms hang under your shoulders.",
            "Set up with a club across your hip crease and push it back until your chest is over the ball.",
        ),
        "excessive_forward_bend" => (
            "Stand a little taller at address; too much bend limits your turn.",
            "Check your posture in a mirror: your spine should be straight, not folded over the ball.",
        ),
        "locked_knees" => (
            "Add a little knee flex at address to stay athletic.",
            "Bounce gently on the balls of your feet, then settle with soft knees.",
        ),
        "excessive_knee_flex" => (
            "Straighten your knees slightly; sitting too low restricts your hip turn.",
            "Set up, then rise until your thighs feel engaged rather than loaded.",
        ),
        "unbalanced_setup" => (
            "Start with your weight evenly split between both feet.",
            "Make practice swings on a balance board or with your feet together.",
        ),
        "bent_lead_arm_takeaway" => (
            "Keep the lead arm extended as the club moves away.",
            "Take the club back to hip height with a glove tucked under your trail arm.",
        ),
        "bent_lead_arm" => (
            "Keep width in your backswing; a collapsing lead arm costs you speed and control.",
            "Make three-quarter backswings feeling your hands stay far from your head.",
        ),
        "restricted_shoulder_turn" => (
            "Turn your shoulders fully; your back should face the target at the top.",
            "Cross your arms over your chest and rotate until your lead shoulder is under your chin.",
        ),
        "shoulder_over_rotation" => (
            "Shorten your turn; over-rotating makes the downswing hard to sequence.",
            "Practice stopping the backswing when your lead shoulder reaches the ball.",
        ),
        "restricted_hip_turn" => (
            "Let your hips turn more in the backswing.",
            "Allow the trail knee to straighten slightly so the hips can rotate.",
        ),
        "excessive_hip_turn" => (
            "Resist with your hips a little more to build coil.",
            "Make backswings with your trail foot flared in and feel the hips brace.",
        ),
        "low_x_factor" => (
            "Create more separation between your shoulders and hips at the top.",
            "Hold your hips still with a club across them while your shoulders keep turning.",
        ),
        "bowed_wrist" => (
            "Your lead wrist is too bowed at the top; keep it closer to flat.",
            "Pause at the top and match the lead wrist angle to the back of your forearm.",
        ),
        "cupped_wrist" => (
            "Your lead wrist is cupped at the top; flatten it to square the clubface.",
            "Pause at the top with the logo of your glove facing the sky and hold it for two seconds.",
        ),
        "reverse_pivot" => (
            "Shift your weight into your trail side during the backswing.",
            "Lift your lead heel slightly in the backswing to feel pressure move back.",
        ),
        "hip_sway" => (
            "Rotate your hips instead of sliding them away from the target.",
            "Place an alignment stick outside your trail hip and turn without touching it.",
        ),
        "hanging_back" => (
            "Get your weight onto your lead side by impact.",
            "Hit shots and hold your finish on your lead foot for three seconds.",
        ),
        "closed_hips_at_impact" => (
            "Clear your hips earlier; they should be open to the target at impact.",
            "Start the downswing by turning your belt buckle toward the target.",
        ),
        "flip" => (
            "Keep your hands ahead of the clubhead through impact.",
            "Make small swings with an impact bag, arriving with a flat lead wrist.",
        ),
        "unstable_lead_leg" => (
            "Post up on a stable lead leg through impact.",
            "Feel your lead knee straighten as you rotate through the ball.",
        ),
        "impact_spine_tilt" => (
            "Adjust your spine tilt at impact; keep your head behind the ball without leaning back.",
            "Hit half shots with your trail shoulder feeling lower than the lead.",
        ),
        "incomplete_finish" => (
            "Finish your swing with nearly all your weight on your lead foot.",
            "Hold a balanced finish with your trail toe only touching the ground.",
        ),
        _ => return None,
    };
    Some(advice)
}

fn club_focus(club: ClubType) -> &'static str {
    match club {
        ClubType::Driver => "with the driver",
        ClubType::Iron => "with your irons",
        ClubType::Wedge => "with your wedges",
    }
}

fn severity_word(severity: f64) -> &'static str {
    if severity >= 0.75 {
        "major"
    } else if severity >= 0.4 {
        "moderate"
    } else {
        "minor"
    }
}

/// Offline coach built from a fixed table of cues and drills
#[derive(Debug, Clone, Default)]
pub struct TemplateCoach;

impl TemplateCoach {
    pub fn new() -> Self {
        Self
    }

    fn tip(&self, fault: &FaultSummary, skill: SkillLevel) -> CoachingTip {
        let text = match advice(&fault.feedback_key) {
            Some((cue, drill)) => match skill {
                SkillLevel::Beginner => format!("{cue} Drill: {drill}"),
                SkillLevel::Intermediate => match (fault.value, fault.ideal_lower, fault.ideal_upper) {
                    (Some(value), Some(lo), Some(hi)) => {
                        format!("{cue} (measured {value:.0}, target {lo:.0} to {hi:.0}) Drill: {drill}")
                    }
                    _ => format!("{cue} Drill: {drill}"),
                },
                SkillLevel::Advanced => cue.to_string(),
            },
            None => format!("Work on: {}.", fault.fault_name),
        };
        CoachingTip {
            feedback_key: fault.feedback_key.clone(),
            phase: Some(fault.phase),
            text,
        }
    }
}

#[async_trait]
impl FeedbackGenerator for TemplateCoach {
    fn name(&self) -> &str {
        "TemplateCoach"
    }

    async fn generate(&self, request: &FeedbackRequest) -> FeedbackResult<CoachingFeedback> {
        self.validate_request(request)?;
        let started = Instant::now();

        let summary = match request.faults.first() {
            None => format!(
                "No faults detected {}. Keep grooving this swing.",
                club_focus(request.club)
            ),
            Some(top) => format!(
                "{} area{} to work on {}; start with the {} issue: {}.",
                request.faults.len(),
                if request.faults.len() == 1 { "" } else { "s" },
                club_focus(request.club),
                severity_word(top.severity),
                top.fault_name.to_lowercase()
            ),
        };

        let tips = request
            .faults
            .iter()
            .map(|fault| self.tip(fault, request.skill_level))
            .collect();

        Ok(CoachingFeedback {
            source: self.name().to_string(),
            summary,
            tips,
            generation_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::FeedbackError;
    use swing_analysis::{MetricKind, TARGETS};
    use swing_core::{PhaseLabel, SessionId};

    fn cupped() -> FaultSummary {
        FaultSummary {
            fault_name: "Cupped lead wrist at the top".to_string(),
            feedback_key: "cupped_wrist".to_string(),
            phase: PhaseLabel::P4,
            severity: 0.8,
            metric: Some(MetricKind::LeadWristExtension),
            value: Some(25.0),
            ideal_lower: Some(-5.0),
            ideal_upper: Some(5.0),
        }
    }

    fn request(faults: Vec<FaultSummary>, skill_level: SkillLevel) -> FeedbackRequest {
        FeedbackRequest {
            session_id: SessionId::new(),
            club: ClubType::Iron,
            skill_level,
            faults,
        }
    }

    #[test]
    fn test_every_catalogue_fault_has_advice() {
        use swing_analysis::RuleShape;
        for target in TARGETS.iter() {
            let keys = match target.shape {
                RuleShape::Band(f) | RuleShape::UpperOnly(f) | RuleShape::LowerOnly(f) => vec![f.key],
                RuleShape::Split { low, high } => vec![low.key, high.key],
            };
            for key in keys {
                assert!(advice(key).is_some(), "no advice for {key}");
            }
        }
    }

    #[tokio::test]
    async fn test_generates_tip_per_fault() {
        let coach = TemplateCoach::new();
        let feedback = coach
            .generate(&request(vec![cupped()], SkillLevel::Intermediate))
            .await
            .unwrap();

        assert_eq!(feedback.source, "TemplateCoach");
        assert!(feedback.summary.contains("major"));
        assert_eq!(feedback.tips.len(), 1);
        assert!(feedback.tips[0].text.contains("cupped"));
        assert!(feedback.tips[0].text.contains("measured 25"));
    }

    #[tokio::test]
    async fn test_clean_swing_summary() {
        let feedback = TemplateCoach::new()
            .generate(&request(Vec::new(), SkillLevel::Advanced))
            .await
            .unwrap();
        assert!(feedback.summary.starts_with("No faults detected"));
        assert!(feedback.tips.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_severity_rejected() {
        let mut fault = cupped();
        fault.severity = 1.5;
        let err = TemplateCoach::new()
            .generate(&request(vec![fault], SkillLevel::Beginner))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::InvalidInput(_)));
    }
}
