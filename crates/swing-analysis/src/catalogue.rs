//! The metric catalogue and per-club target table.
//!
//! Every rule and every extraction step derives from [`TARGETS`]: a row
//! names the phase it is measured on, the metric, the ideal value for each
//! club, the tolerance band around it and the faults raised outside it.

use serde::{Deserialize, Serialize};
use std::fmt;
use swing_core::{ClubType, PhaseLabel};

/// Biomechanical measurements the extractor knows how to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Forward bend of the torso from vertical
    HipHinge,
    LeadKneeFlex,
    /// Share of body weight over the lead foot
    WeightDistribution,
    ShoulderRotation,
    HipRotation,
    /// Shoulder rotation minus hip rotation
    XFactor,
    /// Interior angle of the lead elbow
    LeadArmAngle,
    /// Signed: positive is extension (cupped), negative is flexion (bowed)
    LeadWristExtension,
    /// Positive when the shoulders lean away from the target
    SpineSideBend,
    /// Pelvis shift relative to address, as a share of stance width
    HipSway,
}

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        MetricKind::HipHinge,
        MetricKind::LeadKneeFlex,
        MetricKind::WeightDistribution,
        MetricKind::ShoulderRotation,
        MetricKind::HipRotation,
        MetricKind::XFactor,
        MetricKind::LeadArmAngle,
        MetricKind::LeadWristExtension,
        MetricKind::SpineSideBend,
        MetricKind::HipSway,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::HipHinge => "hip_hinge",
            MetricKind::LeadKneeFlex => "lead_knee_flex",
            MetricKind::WeightDistribution => "weight_distribution",
            MetricKind::ShoulderRotation => "shoulder_rotation",
            MetricKind::HipRotation => "hip_rotation",
            MetricKind::XFactor => "x_factor",
            MetricKind::LeadArmAngle => "lead_arm_angle",
            MetricKind::LeadWristExtension => "lead_wrist_extension",
            MetricKind::SpineSideBend => "spine_side_bend",
            MetricKind::HipSway => "hip_sway",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            MetricKind::WeightDistribution | MetricKind::HipSway => Unit::Percent,
            _ => Unit::Degrees,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Degrees,
    Percent,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Degrees => "°",
            Unit::Percent => "%",
        }
    }
}

/// A named fault and the feedback intent it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultKind {
    /// Stable key, also used as the feedback-intent template key
    pub key: &'static str,
    pub name: &'static str,
}

const fn fault(key: &'static str, name: &'static str) -> FaultKind {
    FaultKind { key, name }
}

/// How a target row turns into rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    /// One rule firing on either side of the band
    Band(FaultKind),
    /// Separate rules below and above the band
    Split { low: FaultKind, high: FaultKind },
    /// Only values above the band are faults
    UpperOnly(FaultKind),
    /// Only values below the band are faults
    LowerOnly(FaultKind),
}

/// One row of the target table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricTarget {
    pub phase: PhaseLabel,
    pub metric: MetricKind,
    /// Ideal value indexed by [`ClubType::ordinal`]
    pub ideal: [f64; 3],
    /// Half-width of the acceptable band around the ideal
    pub tolerance: f64,
    pub shape: RuleShape,
    /// Base severity weight in [0, 1]
    pub weight: f64,
}

impl MetricTarget {
    pub fn ideal_for(&self, club: ClubType) -> f64 {
        self.ideal[club.ordinal()]
    }

    /// Acceptable `(lower, upper)` band for a club
    pub fn range_for(&self, club: ClubType) -> (f64, f64) {
        let ideal = self.ideal_for(club);
        (ideal - self.tolerance, ideal + self.tolerance)
    }
}

const fn row(
    phase: PhaseLabel,
    metric: MetricKind,
    ideal: [f64; 3],
    tolerance: f64,
    shape: RuleShape,
    weight: f64,
) -> MetricTarget {
    MetricTarget {
        phase,
        metric,
        ideal,
        tolerance,
        shape,
        weight,
    }
}

/// Ideal values per club, ordered `[Driver, Iron, Wedge]`
pub static TARGETS: &[MetricTarget] = &[
    // P1 Address
    row(
        PhaseLabel::P1,
        MetricKind::HipHinge,
        [35.0, 37.5, 40.0],
        5.0,
        RuleShape::Split {
            low: fault("upright_posture", "Too upright at address"),
            high: fault("excessive_forward_bend", "Excessive forward bend at address"),
        },
        0.6,
    ),
    row(
        PhaseLabel::P1,
        MetricKind::LeadKneeFlex,
        [25.0, 25.0, 25.0],
        8.0,
        RuleShape::Split {
            low: fault("locked_knees", "Locked knees at address"),
            high: fault("excessive_knee_flex", "Excessive knee flex at address"),
        },
        0.5,
    ),
    row(
        PhaseLabel::P1,
        MetricKind::WeightDistribution,
        [45.0, 50.0, 55.0],
        5.0,
        RuleShape::Band(fault("unbalanced_setup", "Unbalanced weight at address")),
        0.5,
    ),
    // P3 Lead arm parallel
    row(
        PhaseLabel::P3,
        MetricKind::LeadArmAngle,
        [170.0, 170.0, 170.0],
        10.0,
        RuleShape::LowerOnly(fault("bent_lead_arm_takeaway", "Bent lead arm in takeaway")),
        0.6,
    ),
    // P4 Top
    row(
        PhaseLabel::P4,
        MetricKind::LeadArmAngle,
        [165.0, 165.0, 165.0],
        10.0,
        RuleShape::LowerOnly(fault("bent_lead_arm", "Bent lead arm at the top")),
        0.7,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::ShoulderRotation,
        [95.0, 90.0, 80.0],
        10.0,
        RuleShape::Split {
            low: fault("restricted_shoulder_turn", "Restricted shoulder turn"),
            high: fault("shoulder_over_rotation", "Shoulder over-rotation"),
        },
        0.8,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::HipRotation,
        [48.0, 45.0, 40.0],
        10.0,
        RuleShape::Split {
            low: fault("restricted_hip_turn", "Restricted hip turn"),
            high: fault("excessive_hip_turn", "Excessive hip turn"),
        },
        0.6,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::XFactor,
        [48.0, 45.0, 38.0],
        8.0,
        RuleShape::LowerOnly(fault("low_x_factor", "Insufficient hip-shoulder separation")),
        0.7,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::LeadWristExtension,
        [0.0, 0.0, 0.0],
        5.0,
        RuleShape::Split {
            low: fault("bowed_wrist", "Bowed lead wrist at the top"),
            high: fault("cupped_wrist", "Cupped lead wrist at the top"),
        },
        0.9,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::WeightDistribution,
        [30.0, 35.0, 40.0],
        10.0,
        RuleShape::UpperOnly(fault("reverse_pivot", "Reverse pivot")),
        0.9,
    ),
    row(
        PhaseLabel::P4,
        MetricKind::HipSway,
        [0.0, 0.0, 0.0],
        10.0,
        RuleShape::LowerOnly(fault("hip_sway", "Hips sway away from the target")),
        0.7,
    ),
    // P7 Impact
    row(
        PhaseLabel::P7,
        MetricKind::WeightDistribution,
        [75.0, 80.0, 85.0],
        10.0,
        RuleShape::LowerOnly(fault("hanging_back", "Hanging back at impact")),
        1.0,
    ),
    row(
        PhaseLabel::P7,
        MetricKind::HipRotation,
        [-35.0, -40.0, -30.0],
        10.0,
        RuleShape::UpperOnly(fault("closed_hips_at_impact", "Hips not open at impact")),
        0.8,
    ),
    row(
        PhaseLabel::P7,
        MetricKind::LeadWristExtension,
        [-5.0, -5.0, -5.0],
        7.0,
        RuleShape::UpperOnly(fault("flip", "Flipping through impact")),
        1.0,
    ),
    row(
        PhaseLabel::P7,
        MetricKind::LeadKneeFlex,
        [15.0, 15.0, 15.0],
        8.0,
        RuleShape::Band(fault("unstable_lead_leg", "Lead leg not stable at impact")),
        0.5,
    ),
    row(
        PhaseLabel::P7,
        MetricKind::SpineSideBend,
        [15.0, 10.0, 6.0],
        5.0,
        RuleShape::Band(fault("impact_spine_tilt", "Incorrect spine tilt at impact")),
        0.6,
    ),
    // P10 Finish
    row(
        PhaseLabel::P10,
        MetricKind::WeightDistribution,
        [90.0, 90.0, 90.0],
        8.0,
        RuleShape::LowerOnly(fault("incomplete_finish", "Weight not transferred at finish")),
        0.6,
    ),
];

/// Default club multiplier for a metric
pub fn default_multiplier(metric: MetricKind, club: ClubType) -> f64 {
    let [driver, iron, wedge] = match metric {
        MetricKind::WeightDistribution => [1.2, 1.0, 0.8],
        MetricKind::ShoulderRotation | MetricKind::HipRotation | MetricKind::XFactor => {
            [1.1, 1.0, 0.9]
        }
        MetricKind::LeadWristExtension => [0.9, 1.0, 1.1],
        _ => [1.0, 1.0, 1.0],
    };
    match club {
        ClubType::Driver => driver,
        ClubType::Iron => iron,
        ClubType::Wedge => wedge,
    }
}

/// Target row for a phase/metric pair
pub fn target(phase: PhaseLabel, metric: MetricKind) -> Option<&'static MetricTarget> {
    TARGETS
        .iter()
        .find(|t| t.phase == phase && t.metric == metric)
}

/// Metrics measured on a phase, in catalogue order
pub fn metrics_for_phase(phase: PhaseLabel) -> Vec<MetricKind> {
    TARGETS
        .iter()
        .filter(|t| t.phase == phase)
        .map(|t| t.metric)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rows_are_unique_per_phase_and_metric() {
        let mut seen = HashSet::new();
        for t in TARGETS {
            assert!(seen.insert((t.phase, t.metric)), "duplicate row {} {}", t.phase, t.metric);
            assert!(t.tolerance > 0.0);
            assert!((0.0..=1.0).contains(&t.weight));
        }
    }

    #[test]
    fn test_extraction_plan() {
        assert_eq!(
            metrics_for_phase(PhaseLabel::P1),
            vec![
                MetricKind::HipHinge,
                MetricKind::LeadKneeFlex,
                MetricKind::WeightDistribution
            ]
        );
        assert_eq!(metrics_for_phase(PhaseLabel::P4).len(), 7);
        assert!(metrics_for_phase(PhaseLabel::P2).is_empty());
        assert!(metrics_for_phase(PhaseLabel::P10).contains(&MetricKind::WeightDistribution));
    }

    #[test]
    fn test_club_specific_ranges() {
        let hinge = target(PhaseLabel::P1, MetricKind::HipHinge).unwrap();
        assert_eq!(hinge.range_for(ClubType::Iron), (32.5, 42.5));
        assert_eq!(hinge.range_for(ClubType::Driver), (30.0, 40.0));
        assert_eq!(default_multiplier(MetricKind::WeightDistribution, ClubType::Driver), 1.2);
        assert_eq!(default_multiplier(MetricKind::HipHinge, ClubType::Wedge), 1.0);
    }
}
