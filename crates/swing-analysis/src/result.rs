//! Structured analysis results.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swing_core::{
    duration_ms, ClubClassification, ClubType, Handedness, PoseFrame, SessionId, SwingPhase,
    Timestamp, ValidationError,
};

use crate::diagnosis::DetectedFault;
use crate::kpi::KpiMeasurement;

/// Inclusive range of producer frame indices covered by an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpan {
    pub first: u64,
    pub last: u64,
}

impl FrameSpan {
    pub fn of(frames: &[PoseFrame]) -> Option<Self> {
        Some(Self {
            first: frames.first()?.frame_index(),
            last: frames.last()?.frame_index(),
        })
    }
}

/// Run of producer frame indices absent from the analyzed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGap {
    /// Last index present before the gap
    pub after: u64,
    /// First index present after the gap
    pub before: u64,
}

impl FrameGap {
    pub fn missing(&self) -> u64 {
        self.before - self.after - 1
    }
}

/// Explicit list of index gaps in an ordered frame sequence
pub fn frame_gaps(frames: &[PoseFrame]) -> Vec<FrameGap> {
    frames
        .windows(2)
        .filter(|w| w[1].frame_index() > w[0].frame_index() + 1)
        .map(|w| FrameGap {
            after: w[0].frame_index(),
            before: w[1].frame_index(),
        })
        .collect()
}

/// Result of one batch analysis or one streaming window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingAnalysisResult {
    pub session_id: SessionId,
    pub created_at: Timestamp,
    pub club: ClubType,
    /// The club name was not recognized and the Iron rules applied
    pub club_default_applied: bool,
    pub handedness: Handedness,
    pub phases: Vec<SwingPhase>,
    pub phase_confidence: f64,
    pub kpis: Vec<KpiMeasurement>,
    pub faults: Vec<DetectedFault>,
    #[serde(with = "duration_ms")]
    pub analysis_duration: Duration,
    pub frames_analyzed: usize,
    pub frame_span: Option<FrameSpan>,
    pub frame_gaps: Vec<FrameGap>,
    pub rejected_frames: Vec<ValidationError>,
    /// Sequence-level failure, such as too few frames
    pub validation_error: Option<ValidationError>,
    pub skipped_rules: usize,
    /// Stages were cut short (deadline or too few frames)
    pub incomplete: bool,
    /// Input was partially discarded (rejected frames or invalid phases)
    pub degraded: bool,
    /// Final analysis of a streaming session
    pub is_final: bool,
}

impl SwingAnalysisResult {
    pub fn new(session_id: SessionId, club: ClubClassification, handedness: Handedness) -> Self {
        Self {
            session_id,
            created_at: Timestamp::now(),
            club: club.club,
            club_default_applied: club.default_applied,
            handedness,
            phases: Vec::new(),
            phase_confidence: 0.0,
            kpis: Vec::new(),
            faults: Vec::new(),
            analysis_duration: Duration::ZERO,
            frames_analyzed: 0,
            frame_span: None,
            frame_gaps: Vec::new(),
            rejected_frames: Vec::new(),
            validation_error: None,
            skipped_rules: 0,
            incomplete: false,
            degraded: false,
            is_final: false,
        }
    }

    /// Index of the newest frame covered by this result
    pub fn trailing_frame(&self) -> Option<u64> {
        self.frame_span.map(|s| s.last)
    }

    /// Up to `n` most severe faults
    pub fn top_faults(&self, n: usize) -> &[DetectedFault] {
        &self.faults[..n.min(self.faults.len())]
    }

    /// Faults at or above a severity threshold
    pub fn faults_above(&self, threshold: f64) -> impl Iterator<Item = &DetectedFault> {
        self.faults.iter().filter(move |f| f.severity >= threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::synthetic::SyntheticSwing;

    #[test]
    fn test_frame_gaps() {
        let frames: Vec<PoseFrame> = SyntheticSwing::default()
            .truncated(12)
            .frames()
            .into_iter()
            .filter(|f| ![3, 4, 9].contains(&f.frame_index()))
            .collect();

        let gaps = frame_gaps(&frames);
        assert_eq!(
            gaps,
            vec![
                FrameGap { after: 2, before: 5 },
                FrameGap { after: 8, before: 10 }
            ]
        );
        assert_eq!(gaps[0].missing(), 2);
        assert_eq!(FrameSpan::of(&frames), Some(FrameSpan { first: 0, last: 11 }));
        assert_eq!(FrameSpan::of(&[]), None);
    }

    #[test]
    fn test_result_serializes_duration_as_millis() {
        let mut result = SwingAnalysisResult::new(
            SessionId::new(),
            ClubClassification::fallback(),
            Handedness::Right,
        );
        result.analysis_duration = Duration::from_micros(2500);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["analysis_duration"], 2.5);
        assert_eq!(json["club"], "iron");
        assert_eq!(json["club_default_applied"], true);

        let back: SwingAnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.analysis_duration, Duration::from_micros(2500));
    }
}
