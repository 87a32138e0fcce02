//! KPI extraction per swing phase.

use serde::{Deserialize, Serialize};
use swing_core::{BodyFrame, ClubType, Handedness, PhaseLabel, PoseFrame, SwingPhase};

use crate::catalogue::{metrics_for_phase, target, MetricKind, Unit};

/// A single measurement on a phase's key frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMeasurement {
    pub phase: PhaseLabel,
    pub metric: MetricKind,
    pub value: f64,
    pub unit: Unit,
    pub ideal_lower: f64,
    pub ideal_upper: f64,
    /// Signed distance to the nearest ideal bound; 0 inside the band
    pub deviation: f64,
    /// Producer frame index the value was measured on
    pub frame_index: u64,
}

impl KpiMeasurement {
    pub fn new(
        phase: PhaseLabel,
        metric: MetricKind,
        value: f64,
        (ideal_lower, ideal_upper): (f64, f64),
        frame_index: u64,
    ) -> Self {
        let deviation = if value < ideal_lower {
            value - ideal_lower
        } else if value > ideal_upper {
            value - ideal_upper
        } else {
            0.0
        };
        Self {
            phase,
            metric,
            value,
            unit: metric.unit(),
            ideal_lower,
            ideal_upper,
            deviation,
            frame_index,
        }
    }

    pub fn in_range(&self) -> bool {
        self.deviation == 0.0
    }
}

/// Measures the metric catalogue on located phases
#[derive(Debug, Clone, Copy)]
pub struct KpiExtractor {
    handedness: Handedness,
}

impl KpiExtractor {
    pub fn new(handedness: Handedness) -> Self {
        Self { handedness }
    }

    /// Measure every catalogue metric of every phase
    pub fn extract(
        &self,
        frames: &[PoseFrame],
        phases: &[SwingPhase],
        club: ClubType,
    ) -> Vec<KpiMeasurement> {
        let address = address_frame(frames, phases);
        phases
            .iter()
            .flat_map(|phase| self.extract_phase(frames, phase, club, address))
            .collect()
    }

    /// Measure the catalogue metrics of one phase on its start frame.
    /// Metrics whose landmarks are missing are omitted.
    pub fn extract_phase(
        &self,
        frames: &[PoseFrame],
        phase: &SwingPhase,
        club: ClubType,
        address: Option<&PoseFrame>,
    ) -> Vec<KpiMeasurement> {
        let metrics = metrics_for_phase(phase.label);
        if metrics.is_empty() {
            return Vec::new();
        }
        let Some(frame) = frame_at(frames, phase.start_frame) else {
            return Vec::new();
        };

        let body = BodyFrame::new(frame, self.handedness);
        let reference = address.map(|f| BodyFrame::new(f, self.handedness));

        metrics
            .into_iter()
            .filter_map(|metric| {
                let value = measure(&body, reference.as_ref(), metric)?;
                if !value.is_finite() {
                    return None;
                }
                let range = target(phase.label, metric)?.range_for(club);
                Some(KpiMeasurement::new(
                    phase.label,
                    metric,
                    value,
                    range,
                    frame.frame_index(),
                ))
            })
            .collect()
    }
}

fn measure(body: &BodyFrame<'_>, address: Option<&BodyFrame<'_>>, metric: MetricKind) -> Option<f64> {
    match metric {
        MetricKind::HipHinge => body.hip_hinge(),
        MetricKind::LeadKneeFlex => body.lead_knee_flex(),
        MetricKind::WeightDistribution => body.lead_weight_share(),
        MetricKind::ShoulderRotation => body.shoulder_rotation(),
        MetricKind::HipRotation => body.hip_rotation(),
        MetricKind::XFactor => body.x_factor(),
        MetricKind::LeadArmAngle => body.lead_elbow_angle(),
        MetricKind::LeadWristExtension => body.lead_wrist_extension(),
        MetricKind::SpineSideBend => body.spine_side_bend(),
        MetricKind::HipSway => body.hip_shift_from(address?),
    }
}

/// Frame with the given producer index
pub fn frame_at(frames: &[PoseFrame], frame_index: u64) -> Option<&PoseFrame> {
    frames
        .binary_search_by_key(&frame_index, PoseFrame::frame_index)
        .ok()
        .map(|i| &frames[i])
}

/// The P1 key frame, reference for address-relative metrics
pub fn address_frame<'a>(frames: &'a [PoseFrame], phases: &[SwingPhase]) -> Option<&'a PoseFrame> {
    phases
        .iter()
        .find(|p| p.label == PhaseLabel::P1)
        .and_then(|p| frame_at(frames, p.start_frame))
}
