//! P1-P10 phase classification.
//!
//! Events are detected on smoothed per-frame signals, in swing order:
//!
//! | Phase | Event |
//! |-------|-------|
//! | P1 | first frame |
//! | P2 | hands rise through hip height |
//! | P3 | lead arm rises through horizontal |
//! | P4 | maximum shoulder rotation, confirmed by a later decrease |
//! | P5 | lead arm falls through horizontal |
//! | P6 | hands fall through hip height |
//! | P7 | lowest hand point, confirmed by the hands rising again |
//! | P8 | hands rise through hip height |
//! | P9 | trail arm rises through horizontal |
//! | P10 | hand speed settles below a threshold |
//!
//! Each event is searched from the last located event onward. A phase that
//! cannot be located is omitted and the search continues with the next.

use serde::{Deserialize, Serialize};
use swing_core::{hand_speed, BodyFrame, Handedness, PhaseLabel, PoseFrame, SwingPhase};

use crate::filtering::condition_signal;

/// Phase classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Centered moving-average window (frames)
    pub smoothing_window: usize,
    /// Hand speed below which the swing is considered finished (m/s)
    pub settle_speed: f64,
    /// Shoulder rotation drop confirming the top of the backswing (degrees)
    pub top_confirmation_deg: f64,
    /// Hand rise confirming impact (meters)
    pub impact_confirmation: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            settle_speed: 0.5,
            top_confirmation_deg: 2.0,
            impact_confirmation: 0.02,
        }
    }
}

/// Located phases and the share of the ten that were found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseClassification {
    pub phases: Vec<SwingPhase>,
    /// Located phases / 10
    pub confidence: f64,
}

impl PhaseClassification {
    pub fn empty() -> Self {
        Self {
            phases: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Wrap caller-supplied phases
    pub fn provided(phases: Vec<SwingPhase>) -> Self {
        let confidence = phases.len() as f64 / PhaseLabel::COUNT as f64;
        Self { phases, confidence }
    }

    pub fn get(&self, label: PhaseLabel) -> Option<&SwingPhase> {
        self.phases.iter().find(|p| p.label == label)
    }

    pub fn is_complete(&self) -> bool {
        self.phases.len() == PhaseLabel::COUNT
    }
}

/// Smoothed per-frame signals driving event detection
struct Signals {
    hand_height: Option<Vec<f64>>,
    lead_arm: Option<Vec<f64>>,
    trail_arm: Option<Vec<f64>>,
    shoulder_rotation: Option<Vec<f64>>,
    hand_speed: Option<Vec<f64>>,
}

impl Signals {
    fn compute(
        frames: &[PoseFrame],
        frame_rate: f64,
        handedness: Handedness,
        window: usize,
    ) -> Self {
        let bodies: Vec<BodyFrame<'_>> = frames
            .iter()
            .map(|f| BodyFrame::new(f, handedness))
            .collect();

        let speeds: Vec<Option<f64>> = std::iter::once(None)
            .chain(
                frames
                    .windows(2)
                    .map(|w| hand_speed(&w[0], &w[1], handedness, frame_rate)),
            )
            .collect();

        Self {
            hand_height: series(&bodies, window, BodyFrame::hand_height_above_hips),
            lead_arm: series(&bodies, window, BodyFrame::lead_arm_elevation),
            trail_arm: series(&bodies, window, BodyFrame::trail_arm_elevation),
            shoulder_rotation: series(&bodies, window, BodyFrame::shoulder_rotation),
            hand_speed: condition_signal(&speeds, window),
        }
    }
}

fn series<'a, F>(bodies: &[BodyFrame<'a>], window: usize, f: F) -> Option<Vec<f64>>
where
    F: Fn(&BodyFrame<'a>) -> Option<f64>,
{
    let raw: Vec<Option<f64>> = bodies.iter().map(f).collect();
    condition_signal(&raw, window)
}

/// First position at or after `from` where the signal rises through `level`
fn rising_through(signal: &[f64], from: usize, level: f64) -> Option<usize> {
    (from.max(1)..signal.len()).find(|&i| signal[i - 1] < level && signal[i] >= level)
}

/// First position at or after `from` where the signal falls through `level`
fn falling_through(signal: &[f64], from: usize, level: f64) -> Option<usize> {
    (from.max(1)..signal.len()).find(|&i| signal[i - 1] > level && signal[i] <= level)
}

/// Position of the maximum after `from`, provided the signal later drops
/// by at least `confirm` below it
fn confirmed_peak(signal: &[f64], from: usize, confirm: f64) -> Option<usize> {
    let tail = signal.get(from..)?;
    let (offset, peak) = tail
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })?;
    tail[offset..]
        .iter()
        .any(|&v| v <= peak - confirm)
        .then_some(from + offset)
}

/// Position of the lowest point after `from`, provided the signal first
/// dips at least `confirm` below its starting value and then rises at
/// least `confirm` above the low point
fn confirmed_trough(signal: &[f64], from: usize, confirm: f64) -> Option<usize> {
    let mut start = *signal.get(from)?;
    let mut best = (from, start);
    for (i, &v) in signal.iter().enumerate().skip(from + 1) {
        if v < best.1 {
            best = (i, v);
        } else if v >= best.1 + confirm {
            if best.1 <= start - confirm {
                return Some(best.0);
            }
            start = v;
            best = (i, v);
        }
    }
    None
}

/// Stateless P1-P10 classifier
#[derive(Debug, Clone, Default)]
pub struct PhaseClassifier {
    config: ClassifierConfig,
}

impl PhaseClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Segment an ordered, validated frame sequence into swing phases
    pub fn classify(
        &self,
        frames: &[PoseFrame],
        frame_rate: f64,
        handedness: Handedness,
    ) -> PhaseClassification {
        let events = self.locate_events(frames, frame_rate, handedness);
        if events.is_empty() {
            return PhaseClassification::empty();
        }

        let last_frame = frames[frames.len() - 1].frame_index();
        let phases: Vec<SwingPhase> = events
            .iter()
            .enumerate()
            .map(|(k, &(label, pos))| {
                let end = match events.get(k + 1) {
                    Some(&(_, next)) => frames[next - 1].frame_index(),
                    None => last_frame,
                };
                SwingPhase::new(label, frames[pos].frame_index(), end)
            })
            .collect();

        PhaseClassification {
            confidence: phases.len() as f64 / PhaseLabel::COUNT as f64,
            phases,
        }
    }

    /// Event positions (indices into `frames`), strictly increasing
    fn locate_events(
        &self,
        frames: &[PoseFrame],
        frame_rate: f64,
        handedness: Handedness,
    ) -> Vec<(PhaseLabel, usize)> {
        let n = frames.len();
        if n == 0 {
            return Vec::new();
        }

        let cfg = &self.config;
        let signals = Signals::compute(frames, frame_rate, handedness, cfg.smoothing_window);
        let hands = signals.hand_height.as_deref();
        let lead = signals.lead_arm.as_deref();
        let trail = signals.trail_arm.as_deref();
        let shoulders = signals.shoulder_rotation.as_deref();
        let speed = signals.hand_speed.as_deref();

        let mut events: Vec<(PhaseLabel, usize)> = vec![(PhaseLabel::P1, 0)];

        for label in &PhaseLabel::ALL[1..] {
            let cursor = events.last().map(|&(_, pos)| pos).unwrap_or(0);
            let candidate = match label {
                PhaseLabel::P1 => None,
                PhaseLabel::P2 | PhaseLabel::P8 => hands.and_then(|s| rising_through(s, cursor, 0.0)),
                PhaseLabel::P3 => lead.and_then(|s| rising_through(s, cursor, 0.0)),
                PhaseLabel::P4 => {
                    shoulders.and_then(|s| confirmed_peak(s, cursor, cfg.top_confirmation_deg))
                }
                PhaseLabel::P5 => lead.and_then(|s| falling_through(s, cursor, 0.0)),
                PhaseLabel::P6 => hands.and_then(|s| falling_through(s, cursor, 0.0)),
                PhaseLabel::P7 => {
                    hands.and_then(|s| confirmed_trough(s, cursor, cfg.impact_confirmation))
                }
                PhaseLabel::P9 => trail.and_then(|s| rising_through(s, cursor, 0.0)),
                PhaseLabel::P10 => self.finish(speed, &events, cursor, n),
            };

            // Ties go to the earlier phase; the later one moves to the next
            // frame or is dropped when there is none
            let position = match candidate {
                Some(pos) if pos <= cursor => (cursor + 1 < n).then_some(cursor + 1),
                other => other,
            };

            if let Some(pos) = position {
                events.push((*label, pos));
            }
        }

        events
    }

    /// P10: first settled frame after P9, else the last frame when P9 was
    /// found and frames remain after it
    fn finish(
        &self,
        speed: Option<&[f64]>,
        events: &[(PhaseLabel, usize)],
        cursor: usize,
        n: usize,
    ) -> Option<usize> {
        let &(_, p9) = events.iter().find(|(label, _)| *label == PhaseLabel::P9)?;
        speed
            .and_then(|s| ((p9 + 1)..n).find(|&i| s[i] < self.config.settle_speed))
            .or_else(|| (n - 1 > cursor).then_some(n - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::phases_are_ordered;
    use swing_core::synthetic::SyntheticSwing;

    fn start_of(c: &PhaseClassification, label: PhaseLabel) -> Option<u64> {
        c.get(label).map(|p| p.start_frame)
    }

    #[test]
    fn test_full_swing_locates_all_phases() {
        let frames = SyntheticSwing::default().frames();
        let c = PhaseClassifier::default().classify(&frames, 60.0, Handedness::Right);

        assert!(c.is_complete(), "{:?}", c.phases);
        assert_eq!(c.confidence, 1.0);
        assert!(phases_are_ordered(&c.phases));

        assert_eq!(start_of(&c, PhaseLabel::P1), Some(0));
        assert_eq!(start_of(&c, PhaseLabel::P4), Some(40));
        assert_eq!(start_of(&c, PhaseLabel::P7), Some(55));
        let p3 = start_of(&c, PhaseLabel::P3).unwrap();
        assert!((26..=30).contains(&p3), "P3 at {p3}");
        let p9 = start_of(&c, PhaseLabel::P9).unwrap();
        assert!((65..=69).contains(&p9), "P9 at {p9}");

        let last = c.phases.last().unwrap();
        assert_eq!(last.label, PhaseLabel::P10);
        assert_eq!(last.end_frame, 90);
    }

    #[test]
    fn test_left_handed_swing_matches() {
        let right = SyntheticSwing::default().frames();
        let left = SyntheticSwing::default()
            .with_handedness(Handedness::Left)
            .frames();
        let classifier = PhaseClassifier::default();
        let a = classifier.classify(&right, 60.0, Handedness::Right);
        let b = classifier.classify(&left, 60.0, Handedness::Left);
        assert_eq!(a.phases, b.phases);
    }

    #[test]
    fn test_truncated_swing_omits_late_phases() {
        let frames = SyntheticSwing::default().truncated(64).frames();
        let c = PhaseClassifier::default().classify(&frames, 60.0, Handedness::Right);

        assert_eq!(c.phases.len(), 8);
        assert!((c.confidence - 0.8).abs() < 1e-12);
        assert!(c.get(PhaseLabel::P9).is_none());
        assert!(c.get(PhaseLabel::P10).is_none());
        assert_eq!(c.phases.last().unwrap().end_frame, 63);
        assert!(phases_are_ordered(&c.phases));
    }

    #[test]
    fn test_backswing_only_has_no_top() {
        let frames = SyntheticSwing::default().truncated(38).frames();
        let c = PhaseClassifier::default().classify(&frames, 60.0, Handedness::Right);
        assert!(c.get(PhaseLabel::P3).is_some());
        assert!(c.get(PhaseLabel::P4).is_none());
        assert!(c.confidence < 1.0);
    }

    #[test]
    fn test_gaps_use_producer_indices() {
        let frames: Vec<PoseFrame> = SyntheticSwing::default()
            .starting_at(1000)
            .frames()
            .into_iter()
            .filter(|f| f.frame_index() % 7 != 3)
            .collect();
        let c = PhaseClassifier::default().classify(&frames, 60.0, Handedness::Right);
        assert!(phases_are_ordered(&c.phases));
        assert_eq!(c.phases[0].start_frame, 1000);
        for phase in &c.phases {
            assert!(frames.iter().any(|f| f.frame_index() == phase.start_frame));
        }
    }

    #[test]
    fn test_event_search_helpers() {
        assert_eq!(rising_through(&[-1.0, 1.0, 2.0], 0, 0.0), Some(1));
        assert_eq!(falling_through(&[1.0, 1.0, -1.0], 2, 0.0), Some(2));
        assert_eq!(confirmed_peak(&[0.0, 5.0, 4.0], 0, 2.0), None);
        assert_eq!(confirmed_peak(&[0.0, 5.0, 2.0], 0, 2.0), Some(1));
        assert_eq!(confirmed_trough(&[3.0, 1.0, 1.01, 1.5], 0, 0.1), Some(1));
        assert_eq!(confirmed_trough(&[1.0, 1.2, 1.5, 2.0], 0, 0.1), None);
    }

    #[test]
    fn test_empty_and_static_input() {
        let classifier = PhaseClassifier::default();
        assert!(classifier
            .classify(&[], 60.0, Handedness::Right)
            .phases
            .is_empty());

        let still = SyntheticSwing::default().truncated(10).frames();
        let c = classifier.classify(&still, 60.0, Handedness::Right);
        assert_eq!(c.phases.len(), 1);
        assert_eq!(c.phases[0], SwingPhase::new(PhaseLabel::P1, 0, 9));
        assert!((c.confidence - 0.1).abs() < 1e-12);
    }
}
