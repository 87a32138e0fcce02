//! The batch analysis pipeline.
//!
//! Runs Validator → Classifier → Extractor → Diagnosis once over a complete
//! sequence. Analysis never fails on bad data: rejected frames, invalid
//! phase boundaries and expired deadlines are reported through the
//! `degraded` and `incomplete` flags of the result. Only configuration
//! errors (invalid frame rate, unknown club in strict mode) are returned
//! as errors.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use swing_core::{
    classify_club, phases_are_ordered, ClubClassification, Error, Handedness, PoseFrame, Result,
    SessionId, SwingPhase, ValidationError, ValidationFailure,
};

use crate::diagnosis::DiagnosisEngine;
use crate::kpi::{address_frame, KpiExtractor};
use crate::phase::{ClassifierConfig, PhaseClassification, PhaseClassifier};
use crate::result::{frame_gaps, FrameSpan, SwingAnalysisResult};
use crate::rules::SeverityTuning;
use crate::validator::{FrameValidator, ValidatorConfig};

fn default_frame_rate() -> f64 {
    60.0
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub validator: ValidatorConfig,
    pub classifier: ClassifierConfig,
    pub severity: SeverityTuning,
    /// Reject unrecognized club names instead of falling back to Iron
    pub strict_club: bool,
    /// Deadline applied when a request carries none
    pub default_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            classifier: ClassifierConfig::default(),
            severity: SeverityTuning::default(),
            strict_club: false,
            default_timeout_ms: None,
        }
    }
}

/// A complete swing submitted for batch analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub session_id: SessionId,
    pub club_name: String,
    #[serde(default)]
    pub handedness: Handedness,
    pub frames: Vec<PoseFrame>,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Pre-computed phase boundaries, used instead of classification when
    /// valid
    #[serde(default)]
    pub phases: Option<Vec<SwingPhase>>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl AnalysisRequest {
    pub fn new(club_name: impl Into<String>, frames: Vec<PoseFrame>, frame_rate: f64) -> Self {
        Self {
            session_id: SessionId::new(),
            club_name: club_name.into(),
            handedness: Handedness::default(),
            frames,
            frame_rate,
            phases: None,
            timeout_ms: None,
        }
    }
}

/// A validated window of frames from a streaming session
#[derive(Debug, Clone)]
pub struct WindowRequest {
    pub session_id: SessionId,
    pub club: ClubClassification,
    pub handedness: Handedness,
    pub frames: Vec<PoseFrame>,
    pub frame_rate: f64,
    pub is_final: bool,
}

/// Analysis backend used by streaming sessions
pub trait SwingAnalyzer: Send + Sync {
    /// Analyze an already validated window. Never fails; problems are
    /// reported through the result flags.
    fn analyze_window(&self, request: WindowRequest) -> SwingAnalysisResult;
}

#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(timeout_ms: Option<u64>) -> Self {
        Self(timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms)))
    }

    fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

struct StageInput<'a> {
    frames: &'a [PoseFrame],
    frame_rate: f64,
    phases: Option<Vec<SwingPhase>>,
    deadline: Deadline,
}

/// Batch facade over the four analysis stages
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
    validator: FrameValidator,
    classifier: PhaseClassifier,
    engine: DiagnosisEngine,
}

impl AnalysisPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            validator: FrameValidator::new(config.validator.clone()),
            classifier: PhaseClassifier::new(config.classifier.clone()),
            engine: DiagnosisEngine::new(&config.severity),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn validator(&self) -> &FrameValidator {
        &self.validator
    }

    pub fn engine(&self) -> &DiagnosisEngine {
        &self.engine
    }

    /// Classify a club name, honouring strict mode
    pub fn resolve_club(&self, name: &str) -> Result<ClubClassification> {
        let club = classify_club(name);
        if club.default_applied && self.config.strict_club {
            return Err(Error::UnknownClub(name.to_string()));
        }
        Ok(club)
    }

    /// Analyze a complete swing
    pub fn analyze(&self, request: AnalysisRequest) -> Result<SwingAnalysisResult> {
        if !(request.frame_rate.is_finite() && request.frame_rate > 0.0) {
            return Err(Error::InvalidInput(format!(
                "frame rate must be positive, got {}",
                request.frame_rate
            )));
        }
        let club = self.resolve_club(&request.club_name)?;
        let deadline = Deadline::after(request.timeout_ms.or(self.config.default_timeout_ms));

        let submitted = request.frames.len();
        let (frames, rejected) = self.validator.partition(request.frames);
        if !rejected.is_empty() {
            tracing::debug!(
                session = %request.session_id,
                rejected = rejected.len(),
                submitted,
                "Rejected invalid frames"
            );
        }

        let mut result = SwingAnalysisResult::new(request.session_id, club, request.handedness);
        result.degraded = !rejected.is_empty();
        result.rejected_frames = rejected;

        let input = StageInput {
            frames: &frames,
            frame_rate: request.frame_rate,
            phases: request.phases,
            deadline,
        };
        Ok(self.run(input, result))
    }

    fn run(&self, input: StageInput<'_>, mut result: SwingAnalysisResult) -> SwingAnalysisResult {
        let started = Instant::now();
        let frames = input.frames;

        result.frames_analyzed = frames.len();
        result.frame_span = FrameSpan::of(frames);
        result.frame_gaps = frame_gaps(frames);

        let min_frames = self.validator.config().min_frames;
        if frames.len() < min_frames {
            result.validation_error = Some(ValidationError::sequence(
                ValidationFailure::TooFewFrames {
                    required: min_frames,
                    available: frames.len(),
                },
            ));
            result.incomplete = true;
            result.analysis_duration = started.elapsed();
            return result;
        }

        if self.out_of_time(&input.deadline, &mut result, "classification") {
            result.analysis_duration = started.elapsed();
            return result;
        }

        let classification = match input.phases {
            Some(phases) if provided_phases_valid(&phases, frames) => {
                PhaseClassification::provided(phases)
            }
            Some(phases) => {
                tracing::warn!(
                    session = %result.session_id,
                    provided = phases.len(),
                    "Ignoring invalid phase boundaries"
                );
                result.degraded = true;
                self.classifier
                    .classify(frames, input.frame_rate, result.handedness)
            }
            None => self
                .classifier
                .classify(frames, input.frame_rate, result.handedness),
        };
        result.phase_confidence = classification.confidence;
        result.phases = classification.phases;

        let extractor = KpiExtractor::new(result.handedness);
        let address = address_frame(frames, &result.phases);
        let mut kpis = Vec::new();
        for phase in &result.phases {
            if input.deadline.expired() {
                tracing::warn!(
                    session = %result.session_id,
                    phase = %phase.label,
                    "Deadline expired during KPI extraction"
                );
                result.incomplete = true;
                break;
            }
            kpis.extend(extractor.extract_phase(frames, phase, result.club, address));
        }
        result.kpis = kpis;

        if result.incomplete || self.out_of_time(&input.deadline, &mut result, "diagnosis") {
            result.analysis_duration = started.elapsed();
            return result;
        }

        let diagnosis = self.engine.diagnose(result.club, &result.kpis);
        result.faults = diagnosis.faults;
        result.skipped_rules = diagnosis.skipped_rules;
        result.analysis_duration = started.elapsed();

        tracing::debug!(
            session = %result.session_id,
            phases = result.phases.len(),
            kpis = result.kpis.len(),
            faults = result.faults.len(),
            elapsed_ms = result.analysis_duration.as_secs_f64() * 1000.0,
            "Analysis complete"
        );

        result
    }

    fn out_of_time(&self, deadline: &Deadline, result: &mut SwingAnalysisResult, stage: &str) -> bool {
        if deadline.expired() {
            tracing::warn!(session = %result.session_id, stage, "Deadline expired");
            result.incomplete = true;
        }
        result.incomplete
    }
}

impl SwingAnalyzer for AnalysisPipeline {
    fn analyze_window(&self, request: WindowRequest) -> SwingAnalysisResult {
        let mut result = SwingAnalysisResult::new(request.session_id, request.club, request.handedness);
        result.is_final = request.is_final;

        let input = StageInput {
            frames: &request.frames,
            frame_rate: request.frame_rate,
            phases: None,
            deadline: Deadline(None),
        };
        self.run(input, result)
    }
}

/// Caller-supplied phases must be non-empty, ordered, and inside the
/// analyzed frame range
fn provided_phases_valid(phases: &[SwingPhase], frames: &[PoseFrame]) -> bool {
    let Some(span) = FrameSpan::of(frames) else {
        return false;
    };
    !phases.is_empty()
        && phases_are_ordered(phases)
        && phases
            .iter()
            .all(|p| p.start_frame >= span.first && p.end_frame <= span.last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MetricKind;
    use swing_core::synthetic::{BodyPose, SyntheticSwing};
    use swing_core::{ClubType, Landmark, PhaseLabel};

    fn request(club: &str, swing: SyntheticSwing) -> AnalysisRequest {
        AnalysisRequest::new(club, swing.frames(), 60.0)
    }

    #[test]
    fn test_clean_iron_swing_has_no_faults() {
        let pipeline = AnalysisPipeline::default();
        let result = pipeline
            .analyze(request("7 Iron", SyntheticSwing::default()))
            .unwrap();

        assert_eq!(result.club, ClubType::Iron);
        assert!(!result.club_default_applied);
        assert_eq!(result.phases.len(), 10);
        assert_eq!(result.phase_confidence, 1.0);
        assert!(result.faults.is_empty(), "{:#?}", result.faults);
        assert!(!result.incomplete);
        assert!(!result.degraded);
        assert_eq!(result.skipped_rules, 0);
        assert_eq!(result.frame_span, Some(FrameSpan { first: 0, last: 90 }));
    }

    #[test]
    fn test_cupped_wrist_scenario() {
        let swing = SyntheticSwing::default().with_top(BodyPose {
            wrist_extension: 25.0,
            ..BodyPose::top()
        });
        let result = AnalysisPipeline::default()
            .analyze(request("7 Iron", swing))
            .unwrap();

        let fault = result
            .faults
            .iter()
            .find(|f| f.rule_id.contains("cupped_wrist"))
            .expect("cupped wrist fault");
        assert_eq!(fault.phase, PhaseLabel::P4);
        assert!(fault.severity > 0.0);
        assert_eq!(fault.measurements[0].metric, MetricKind::LeadWristExtension);
    }

    #[test]
    fn test_ideal_hinge_has_no_false_positive() {
        let result = AnalysisPipeline::default()
            .analyze(request("PW", SyntheticSwing::default()))
            .unwrap();
        let hinge = result
            .kpis
            .iter()
            .find(|k| k.phase == PhaseLabel::P1 && k.metric == MetricKind::HipHinge)
            .unwrap();
        assert!((hinge.value - 37.5).abs() < 1e-6);

        let iron = AnalysisPipeline::default()
            .analyze(request("8 iron", SyntheticSwing::default()))
            .unwrap();
        assert!(!iron.faults.iter().any(|f| f.rule_id.contains("hip_hinge")));
    }

    #[test]
    fn test_partial_coverage() {
        let result = AnalysisPipeline::default()
            .analyze(request("7 Iron", SyntheticSwing::default().truncated(64)))
            .unwrap();

        assert_eq!(result.phases.len(), 8);
        assert!((result.phase_confidence - 0.8).abs() < 1e-12);
        assert!(result.kpis.iter().all(|k| k.phase <= PhaseLabel::P8));
        assert!(result.kpis.iter().any(|k| k.phase == PhaseLabel::P7));
        assert!(!result.incomplete);
        // The P10 weight rule has no measurement
        assert_eq!(result.skipped_rules, 1);
    }

    #[test]
    fn test_determinism() {
        let pipeline = AnalysisPipeline::default();
        let swing = SyntheticSwing::default().with_impact(BodyPose {
            pelvis_shift: 0.0,
            ..BodyPose::impact()
        });
        let a = pipeline.analyze(request("Driver", swing.clone())).unwrap();
        let b = pipeline.analyze(request("Driver", swing)).unwrap();

        assert_eq!(a.phases, b.phases);
        assert_eq!(a.kpis, b.kpis);
        assert_eq!(a.faults, b.faults);
        assert!(!a.faults.is_empty());
    }

    #[test]
    fn test_unknown_club_fallback_and_strict_mode() {
        let lenient = AnalysisPipeline::default()
            .analyze(request("unknown-xyz", SyntheticSwing::default()))
            .unwrap();
        assert_eq!(lenient.club, ClubType::Iron);
        assert!(lenient.club_default_applied);

        let strict = AnalysisPipeline::new(PipelineConfig {
            strict_club: true,
            ..PipelineConfig::default()
        });
        let err = strict
            .analyze(request("unknown-xyz", SyntheticSwing::default()))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownClub(name) if name == "unknown-xyz"));
    }

    #[test]
    fn test_invalid_frame_rate_is_an_error() {
        let mut req = request("Driver", SyntheticSwing::default());
        req.frame_rate = 0.0;
        assert!(matches!(
            AnalysisPipeline::default().analyze(req),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejected_frames_degrade_but_do_not_fail() {
        let mut frames = SyntheticSwing::default().frames();
        frames[30] = frames[30].without(&[Landmark::LeftShoulder]);
        frames[31] = frames[31].without(&[Landmark::LeftShoulder]);
        let result = AnalysisPipeline::default()
            .analyze(AnalysisRequest::new("Driver", frames, 60.0))
            .unwrap();

        assert!(result.degraded);
        assert_eq!(result.rejected_frames.len(), 2);
        assert_eq!(result.rejected_frames[0].frame_index, Some(30));
        assert_eq!(result.frame_gaps.len(), 1);
        assert_eq!(result.frame_gaps[0].missing(), 2);
        assert_eq!(result.phases.len(), 10);
    }

    #[test]
    fn test_too_few_frames_is_incomplete() {
        let result = AnalysisPipeline::default()
            .analyze(request("Driver", SyntheticSwing::default().truncated(4)))
            .unwrap();
        assert!(result.incomplete);
        assert!(result.phases.is_empty());
        assert!(matches!(
            result.validation_error.as_ref().map(|e| &e.failure),
            Some(ValidationFailure::TooFewFrames { available: 4, .. })
        ));
    }

    #[test]
    fn test_expired_deadline_returns_partial_result() {
        let mut req = request("Driver", SyntheticSwing::default());
        req.timeout_ms = Some(0);
        let result = AnalysisPipeline::default().analyze(req).unwrap();
        assert!(result.incomplete);
        assert!(result.faults.is_empty());
        assert_eq!(result.frames_analyzed, 91);
    }

    #[test]
    fn test_provided_phases() {
        let pipeline = AnalysisPipeline::default();
        let phases = vec![
            SwingPhase::new(PhaseLabel::P1, 0, 39),
            SwingPhase::new(PhaseLabel::P4, 40, 54),
            SwingPhase::new(PhaseLabel::P7, 55, 90),
        ];
        let mut req = request("7 Iron", SyntheticSwing::default());
        req.phases = Some(phases.clone());
        let result = pipeline.analyze(req).unwrap();
        assert_eq!(result.phases, phases);
        assert!((result.phase_confidence - 0.3).abs() < 1e-12);
        assert!(!result.degraded);

        let mut req = request("7 Iron", SyntheticSwing::default());
        req.phases = Some(vec![
            SwingPhase::new(PhaseLabel::P4, 40, 54),
            SwingPhase::new(PhaseLabel::P1, 55, 90),
        ]);
        let result = pipeline.analyze(req).unwrap();
        assert!(result.degraded);
        assert_eq!(result.phases.len(), 10);
    }

    #[test]
    fn test_window_analysis_is_marked_final() {
        let pipeline = AnalysisPipeline::default();
        let result = pipeline.analyze_window(WindowRequest {
            session_id: SessionId::new(),
            club: classify_club("Driver"),
            handedness: Handedness::Right,
            frames: SyntheticSwing::default().frames(),
            frame_rate: 60.0,
            is_final: true,
        });
        assert!(result.is_final);
        assert_eq!(result.club, ClubType::Driver);
        assert_eq!(result.phases.len(), 10);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let frames = SyntheticSwing::default().truncated(2).frames();
        let json = serde_json::json!({
            "club_name": "SW",
            "frames": frames,
        });
        let req: AnalysisRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.frame_rate, 60.0);
        assert_eq!(req.handedness, Handedness::Right);
        assert!(req.phases.is_none());
        assert_eq!(req.frames.len(), 2);
    }
}
