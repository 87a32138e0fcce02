//! Fault diagnosis against the club rule matrix.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use swing_core::{ClubType, PhaseLabel};

use crate::catalogue::MetricKind;
use crate::kpi::KpiMeasurement;
use crate::rules::{RuleMatrix, SeverityTuning};

/// A rule that fired on a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFault {
    /// `rule_id#frame_index`
    pub fault_id: String,
    pub rule_id: String,
    pub phase: PhaseLabel,
    /// Severity in [0, 1]
    pub severity: f64,
    pub fault_name: String,
    pub feedback_key: String,
    pub club: ClubType,
    /// Measurements that triggered the rule
    pub measurements: Vec<KpiMeasurement>,
}

impl DetectedFault {
    pub fn frame_index(&self) -> Option<u64> {
        self.measurements.first().map(|m| m.frame_index)
    }
}

/// Severity descending, then phase order, then rule id
pub fn fault_order(a: &DetectedFault, b: &DetectedFault) -> Ordering {
    b.severity
        .total_cmp(&a.severity)
        .then_with(|| a.phase.cmp(&b.phase))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
}

/// Outcome of evaluating a rule set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub faults: Vec<DetectedFault>,
    /// Rules whose metric was not measured
    pub skipped_rules: usize,
    pub rules_evaluated: usize,
}

/// Evaluates measurements against an immutable rule matrix
#[derive(Debug, Clone, Default)]
pub struct DiagnosisEngine {
    matrix: RuleMatrix,
}

impl DiagnosisEngine {
    pub fn new(tuning: &SeverityTuning) -> Self {
        Self {
            matrix: RuleMatrix::new(tuning),
        }
    }

    pub fn matrix(&self) -> &RuleMatrix {
        &self.matrix
    }

    /// Evaluate every rule of `club` against the measurements. All firing
    /// rules are kept, in [`fault_order`].
    pub fn diagnose(&self, club: ClubType, kpis: &[KpiMeasurement]) -> Diagnosis {
        let by_key: HashMap<(PhaseLabel, MetricKind), &KpiMeasurement> =
            kpis.iter().map(|k| ((k.phase, k.metric), k)).collect();

        let mut diagnosis = Diagnosis::default();

        for rule in self.matrix.rules(club) {
            let Some(kpi) = by_key.get(&(rule.phase, rule.metric)) else {
                diagnosis.skipped_rules += 1;
                continue;
            };
            diagnosis.rules_evaluated += 1;

            if let Some(severity) = rule.severity(kpi.value, self.matrix.span()) {
                diagnosis.faults.push(DetectedFault {
                    fault_id: format!("{}#{}", rule.id, kpi.frame_index),
                    rule_id: rule.id.clone(),
                    phase: rule.phase,
                    severity,
                    fault_name: rule.fault_name.clone(),
                    feedback_key: rule.feedback_key.clone(),
                    club,
                    measurements: vec![(*kpi).clone()],
                });
            }
        }

        diagnosis.faults.sort_by(fault_order);
        diagnosis
    }
}
