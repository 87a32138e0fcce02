//! Fault rules, conditions and rule generation.

use serde::{Deserialize, Serialize};
use swing_core::{ClubType, PhaseLabel};

use crate::catalogue::{default_multiplier, FaultKind, MetricKind, RuleShape, TARGETS};

/// Default severity span, in multiples of the tolerance: a value one span
/// beyond the boundary reaches full base severity
pub const DEFAULT_SEVERITY_SPAN: f64 = 3.0;

/// Closed set of rule conditions.
///
/// The target table only yields range and threshold conditions.
/// `Equals` and `NotEquals` complete the set for rules built outside the
/// table; they carry the weighted severity with no distance scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    OutsideRange { lower: f64, upper: f64 },
    LessThan { threshold: f64 },
    GreaterThan { threshold: f64 },
    Equals { target: f64, epsilon: f64 },
    NotEquals { target: f64, epsilon: f64 },
}

impl Condition {
    /// Whether the condition holds. Comparisons are strict and NaN never
    /// satisfies a condition.
    pub fn is_met(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match *self {
            Condition::OutsideRange { lower, upper } => value < lower || value > upper,
            Condition::LessThan { threshold } => value < threshold,
            Condition::GreaterThan { threshold } => value > threshold,
            Condition::Equals { target, epsilon } => (value - target).abs() <= epsilon,
            Condition::NotEquals { target, epsilon } => (value - target).abs() > epsilon,
        }
    }

    /// Distance beyond the violated boundary, or `None` for equality
    /// conditions which have no boundary
    pub fn excess(&self, value: f64) -> Option<f64> {
        match *self {
            Condition::OutsideRange { lower, upper } => Some(if value < lower {
                lower - value
            } else if value > upper {
                value - upper
            } else {
                0.0
            }),
            Condition::LessThan { threshold } => Some((threshold - value).max(0.0)),
            Condition::GreaterThan { threshold } => Some((value - threshold).max(0.0)),
            Condition::Equals { .. } | Condition::NotEquals { .. } => None,
        }
    }
}

/// A single generated rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRule {
    /// `club.phase.metric.fault`, unique across all clubs
    pub id: String,
    pub club: ClubType,
    pub phase: PhaseLabel,
    pub metric: MetricKind,
    pub condition: Condition,
    pub tolerance: f64,
    pub weight: f64,
    pub multiplier: f64,
    pub fault_name: String,
    /// Feedback-intent template key
    pub feedback_key: String,
}

impl FaultRule {
    /// Severity in [0, 1] for a value, or `None` when the rule does not fire
    pub fn severity(&self, value: f64, span: f64) -> Option<f64> {
        if !self.condition.is_met(value) {
            return None;
        }
        let weighted = self.weight * self.multiplier;
        let severity = match self.condition.excess(value) {
            Some(excess) => {
                let denom = span * self.tolerance;
                let base = if denom > 0.0 {
                    (excess / denom).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                base * weighted
            }
            None => weighted,
        };
        Some(severity.clamp(0.0, 1.0))
    }
}

/// Multiplier override for a (club, metric) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierOverride {
    pub club: ClubType,
    pub metric: MetricKind,
    pub multiplier: f64,
}

/// Tunable severity parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityTuning {
    pub span: f64,
    pub overrides: Vec<MultiplierOverride>,
}

impl Default for SeverityTuning {
    fn default() -> Self {
        Self {
            span: DEFAULT_SEVERITY_SPAN,
            overrides: Vec::new(),
        }
    }
}

impl SeverityTuning {
    pub fn multiplier(&self, club: ClubType, metric: MetricKind) -> f64 {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.club == club && o.metric == metric)
            .map(|o| o.multiplier.max(0.0))
            .unwrap_or_else(|| default_multiplier(metric, club))
    }
}

/// Generate the rule set for a club from the static target table
pub fn generate_rules(club: ClubType) -> Vec<FaultRule> {
    generate_rules_with(club, &SeverityTuning::default())
}

/// Generate the rule set for a club with multiplier overrides applied
pub fn generate_rules_with(club: ClubType, tuning: &SeverityTuning) -> Vec<FaultRule> {
    let mut rules = Vec::with_capacity(TARGETS.len() * 2);

    for target in TARGETS {
        let (lower, upper) = target.range_for(club);
        let multiplier = tuning.multiplier(club, target.metric);
        let mut push = |condition: Condition, kind: FaultKind| {
            rules.push(FaultRule {
                id: format!(
                    "{}.{}.{}.{}",
                    club.code(),
                    target.phase.code(),
                    target.metric.name(),
                    kind.key
                ),
                club,
                phase: target.phase,
                metric: target.metric,
                condition,
                tolerance: target.tolerance,
                weight: target.weight,
                multiplier,
                fault_name: kind.name.to_string(),
                feedback_key: kind.key.to_string(),
            });
        };

        match target.shape {
            RuleShape::Band(kind) => push(Condition::OutsideRange { lower, upper }, kind),
            RuleShape::Split { low, high } => {
                push(Condition::LessThan { threshold: lower }, low);
                push(Condition::GreaterThan { threshold: upper }, high);
            }
            RuleShape::UpperOnly(kind) => push(Condition::GreaterThan { threshold: upper }, kind),
            RuleShape::LowerOnly(kind) => push(Condition::LessThan { threshold: lower }, kind),
        }
    }

    rules
}

/// Immutable rule table for every club, built once
#[derive(Debug, Clone)]
pub struct RuleMatrix {
    rules: [Vec<FaultRule>; 3],
    span: f64,
}

impl RuleMatrix {
    pub fn new(tuning: &SeverityTuning) -> Self {
        Self {
            rules: ClubType::ALL.map(|club| generate_rules_with(club, tuning)),
            span: tuning.span,
        }
    }

    pub fn rules(&self, club: ClubType) -> &[FaultRule] {
        &self.rules[club.ordinal()]
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn len(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RuleMatrix {
    fn default() -> Self {
        Self::new(&SeverityTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rule(condition: Condition, weight: f64, multiplier: f64) -> FaultRule {
        FaultRule {
            id: "iron.p1.hip_hinge.test".into(),
            club: ClubType::Iron,
            phase: PhaseLabel::P1,
            metric: MetricKind::HipHinge,
            condition,
            tolerance: 5.0,
            weight,
            multiplier,
            fault_name: "Test".into(),
            feedback_key: "test".into(),
        }
    }

    #[test]
    fn test_conditions_are_strict() {
        let band = Condition::OutsideRange {
            lower: 32.5,
            upper: 42.5,
        };
        assert!(!band.is_met(32.5));
        assert!(!band.is_met(42.5));
        assert!(band.is_met(42.6));
        assert!(!band.is_met(f64::NAN));

        assert!(!Condition::LessThan { threshold: 5.0 }.is_met(5.0));
        assert!(Condition::GreaterThan { threshold: 5.0 }.is_met(5.0001));

        let eq = Condition::Equals {
            target: 1.0,
            epsilon: 0.01,
        };
        assert!(eq.is_met(1.005));
        assert!(!eq.is_met(1.02));
        let ne = Condition::NotEquals {
            target: 1.0,
            epsilon: 0.01,
        };
        assert!(ne.is_met(1.02));
        assert!(!ne.is_met(1.0));
    }

    #[test]
    fn test_severity_zero_at_boundary_and_bounded() {
        let r = rule(Condition::GreaterThan { threshold: 5.0 }, 0.9, 1.0);
        assert_eq!(r.severity(5.0, 3.0), None);

        let just_over = r.severity(5.0 + 1e-9, 3.0).unwrap();
        assert!(just_over >= 0.0 && just_over < 1e-6);

        let half = r.severity(12.5, 3.0).unwrap();
        assert!((half - 0.45).abs() < 1e-9);

        for value in [6.0, 50.0, 1e9] {
            let s = r.severity(value, 3.0).unwrap();
            assert!((0.0..=1.0).contains(&s));
        }

        let boosted = rule(Condition::GreaterThan { threshold: 5.0 }, 1.0, 2.5);
        assert_eq!(boosted.severity(1e6, 3.0), Some(1.0));
    }

    #[test]
    fn test_generated_rules_severity_bounds() {
        let span = DEFAULT_SEVERITY_SPAN;
        let grid: Vec<f64> = (-800..=800).map(|i| i as f64 * 0.5).collect();

        for club in ClubType::ALL {
            for rule in generate_rules(club) {
                let boundaries: Vec<f64> = match rule.condition {
                    Condition::OutsideRange { lower, upper } => vec![lower, upper],
                    Condition::LessThan { threshold } | Condition::GreaterThan { threshold } => {
                        vec![threshold]
                    }
                    Condition::Equals { .. } | Condition::NotEquals { .. } => {
                        panic!("table produced an equality rule: {}", rule.id)
                    }
                };
                for boundary in boundaries {
                    assert_eq!(rule.severity(boundary, span), None, "{}", rule.id);
                }

                for value in grid.iter().copied().chain([-1e9, 1e9]) {
                    if let Some(s) = rule.severity(value, span) {
                        assert!((0.0..=1.0).contains(&s), "{} at {value}: {s}", rule.id);
                    }
                }
            }
        }

        // Impact weight transfer: base weight 1.0 boosted 1.2x for Driver
        let hanging_back = generate_rules(ClubType::Driver)
            .into_iter()
            .find(|r| r.phase == PhaseLabel::P7 && r.metric == MetricKind::WeightDistribution)
            .expect("driver impact weight rule");
        assert!(hanging_back.weight * hanging_back.multiplier > 1.0);
        let Condition::LessThan { threshold } = hanging_back.condition else {
            panic!("unexpected condition {:?}", hanging_back.condition);
        };
        assert_eq!(hanging_back.severity(threshold - 1e6, span), Some(1.0));
    }

    #[test]
    fn test_equals_carries_weighted_severity() {
        let r = rule(
            Condition::Equals {
                target: 0.0,
                epsilon: 0.5,
            },
            0.6,
            0.5,
        );
        assert_eq!(r.severity(0.2, 3.0), Some(0.3));
        assert_eq!(r.severity(2.0, 3.0), None);
    }

    #[test]
    fn test_generate_rules_is_pure_and_unique() {
        for club in ClubType::ALL {
            let a = generate_rules(club);
            let b = generate_rules(club);
            assert_eq!(a, b);

            let ids: HashSet<_> = a.iter().map(|r| r.id.clone()).collect();
            assert_eq!(ids.len(), a.len());
            assert!(a.iter().all(|r| r.club == club));
        }
    }

    #[test]
    fn test_split_shape_generates_two_rules() {
        let rules = generate_rules(ClubType::Iron);
        let wrist: Vec<_> = rules
            .iter()
            .filter(|r| r.phase == PhaseLabel::P4 && r.metric == MetricKind::LeadWristExtension)
            .collect();
        assert_eq!(wrist.len(), 2);
        assert!(wrist
            .iter()
            .any(|r| r.id == "iron.p4.lead_wrist_extension.cupped_wrist"
                && r.condition == Condition::GreaterThan { threshold: 5.0 }));
        assert!(wrist.iter().any(|r| r.feedback_key == "bowed_wrist"));
    }

    #[test]
    fn test_multiplier_override() {
        let tuning = SeverityTuning {
            overrides: vec![MultiplierOverride {
                club: ClubType::Wedge,
                metric: MetricKind::HipSway,
                multiplier: 1.5,
            }],
            ..SeverityTuning::default()
        };
        let rules = generate_rules_with(ClubType::Wedge, &tuning);
        let sway = rules
            .iter()
            .find(|r| r.metric == MetricKind::HipSway)
            .unwrap();
        assert_eq!(sway.multiplier, 1.5);

        let driver = generate_rules_with(ClubType::Driver, &tuning);
        let sway = driver
            .iter()
            .find(|r| r.metric == MetricKind::HipSway)
            .unwrap();
        assert_eq!(sway.multiplier, 1.0);
    }

    #[test]
    fn test_rule_matrix_holds_all_clubs() {
        let matrix = RuleMatrix::default();
        let per_club = generate_rules(ClubType::Iron).len();
        assert_eq!(matrix.len(), per_club * 3);
        assert_eq!(matrix.rules(ClubType::Driver)[0].club, ClubType::Driver);
    }
}
