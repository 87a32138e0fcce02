//! Pose frame validation.
//!
//! Frames are checked individually (required landmarks, finite coordinates
//! inside the capture volume, visibility range) and against the previously
//! accepted frame (ordering and per-frame displacement). Invalid data is
//! rejected, never clamped.

use serde::{Deserialize, Serialize};
use swing_core::{BoundingBox3D, Landmark, PoseFrame, ValidationError, ValidationFailure};

/// Validator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Landmarks every frame must carry
    pub required_landmarks: Vec<Landmark>,
    /// Accepted coordinate volume
    pub bounds: BoundingBox3D,
    /// Maximum landmark movement between consecutive frame indices
    pub max_displacement_per_frame: f64,
    /// Minimum sequence length for analysis
    pub min_frames: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            required_landmarks: vec![
                Landmark::LeftShoulder,
                Landmark::RightShoulder,
                Landmark::LeftElbow,
                Landmark::RightElbow,
                Landmark::LeftWrist,
                Landmark::RightWrist,
                Landmark::LeftHip,
                Landmark::RightHip,
            ],
            bounds: BoundingBox3D::capture_volume(),
            max_displacement_per_frame: 0.6,
            min_frames: 10,
        }
    }
}

/// Stateless frame validator
#[derive(Debug, Clone, Default)]
pub struct FrameValidator {
    config: ValidatorConfig,
}

impl FrameValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check a single frame in isolation
    pub fn validate_frame(&self, frame: &PoseFrame) -> Result<(), ValidationError> {
        let idx = frame.frame_index();

        if let Some(missing) = self
            .config
            .required_landmarks
            .iter()
            .find(|lm| !frame.contains(**lm))
        {
            return Err(ValidationError::landmark(
                idx,
                *missing,
                ValidationFailure::MissingLandmark,
            ));
        }

        for (landmark, point) in frame.landmarks() {
            if !point.position.is_finite() {
                return Err(ValidationError::landmark(
                    idx,
                    *landmark,
                    ValidationFailure::NonFinite,
                ));
            }
            if let Some((axis, value, min, max)) = self.config.bounds.violation(&point.position) {
                return Err(ValidationError::landmark(
                    idx,
                    *landmark,
                    ValidationFailure::OutOfBounds {
                        axis,
                        value,
                        min,
                        max,
                    },
                ));
            }
            if !(0.0..=1.0).contains(&point.visibility) {
                return Err(ValidationError::landmark(
                    idx,
                    *landmark,
                    ValidationFailure::VisibilityOutOfRange {
                        value: point.visibility,
                    },
                ));
            }
        }

        Ok(())
    }

    /// Check `next` against the previously accepted frame
    pub fn validate_transition(
        &self,
        previous: &PoseFrame,
        next: &PoseFrame,
    ) -> Result<(), ValidationError> {
        let idx = next.frame_index();

        if idx <= previous.frame_index() {
            return Err(ValidationError::frame(
                idx,
                ValidationFailure::NonMonotonicIndex {
                    previous: previous.frame_index(),
                },
            ));
        }

        if next.timestamp() < previous.timestamp() {
            return Err(ValidationError::frame(
                idx,
                ValidationFailure::NonMonotonicTimestamp {
                    timestamp: next.timestamp(),
                    previous: previous.timestamp(),
                },
            ));
        }

        let gap = (idx - previous.frame_index()) as f64;
        let max = self.config.max_displacement_per_frame * gap;

        for (landmark, point) in next.landmarks() {
            let Some(prev) = previous.get(*landmark) else {
                continue;
            };
            let distance = point.position.distance_to(&prev.position);
            if distance > max {
                return Err(ValidationError::landmark(
                    idx,
                    *landmark,
                    ValidationFailure::Displacement { distance, max },
                ));
            }
        }

        Ok(())
    }

    /// Validate a frame against an optional predecessor
    pub fn validate_next(
        &self,
        previous: Option<&PoseFrame>,
        frame: &PoseFrame,
    ) -> Result<(), ValidationError> {
        self.validate_frame(frame)?;
        match previous {
            Some(prev) => self.validate_transition(prev, frame),
            None => Ok(()),
        }
    }

    /// Strict check of a whole sequence: fails on the first invalid frame
    /// or when the sequence is shorter than `min_frames`
    pub fn validate_sequence(&self, frames: &[PoseFrame]) -> Result<(), ValidationError> {
        if frames.len() < self.config.min_frames {
            return Err(ValidationError::sequence(ValidationFailure::TooFewFrames {
                required: self.config.min_frames,
                available: frames.len(),
            }));
        }

        let mut previous: Option<&PoseFrame> = None;
        for frame in frames {
            self.validate_next(previous, frame)?;
            previous = Some(frame);
        }
        Ok(())
    }

    /// Lenient split of a sequence into accepted frames and rejections.
    /// Each frame is checked against the last accepted frame.
    pub fn partition<I>(&self, frames: I) -> (Vec<PoseFrame>, Vec<ValidationError>)
    where
        I: IntoIterator<Item = PoseFrame>,
    {
        let mut accepted: Vec<PoseFrame> = Vec::new();
        let mut rejected = Vec::new();

        for frame in frames {
            match self.validate_next(accepted.last(), &frame) {
                Ok(()) => accepted.push(frame),
                Err(e) => rejected.push(e),
            }
        }

        (accepted, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::synthetic::SyntheticSwing;
    use swing_core::{LandmarkPoint, Position3D};

    fn swing() -> Vec<PoseFrame> {
        SyntheticSwing::default().frames()
    }

    fn with_point(frame: &PoseFrame, landmark: Landmark, point: LandmarkPoint) -> PoseFrame {
        let mut landmarks = frame.landmarks().clone();
        landmarks.insert(landmark, point);
        PoseFrame::new(frame.frame_index(), frame.timestamp(), landmarks)
    }

    #[test]
    fn test_synthetic_swing_is_valid() {
        let validator = FrameValidator::default();
        assert!(validator.validate_sequence(&swing()).is_ok());
    }

    #[test]
    fn test_missing_required_landmark() {
        let validator = FrameValidator::default();
        let frame = swing()[0].without(&[Landmark::RightWrist]);
        let err = validator.validate_frame(&frame).unwrap_err();
        assert_eq!(err.landmark, Some(Landmark::RightWrist));
        assert_eq!(err.failure, ValidationFailure::MissingLandmark);

        // Optional landmarks may be absent
        let frame = swing()[0].without(&[Landmark::Nose, Landmark::LeftHeel]);
        assert!(validator.validate_frame(&frame).is_ok());
    }

    #[test]
    fn test_out_of_bounds_is_rejected_not_clamped() {
        let validator = FrameValidator::default();
        let frame = with_point(
            &swing()[5],
            Landmark::LeftKnee,
            LandmarkPoint::new(Position3D::new(0.2, 0.5, 2.5), 0.9),
        );
        let err = validator.validate_frame(&frame).unwrap_err();
        assert_eq!(err.frame_index, Some(5));
        assert_eq!(err.landmark, Some(Landmark::LeftKnee));
        assert!(matches!(err.failure, ValidationFailure::OutOfBounds { axis: 'z', .. }));
    }

    #[test]
    fn test_non_finite_and_visibility() {
        let validator = FrameValidator::default();
        let nan = with_point(
            &swing()[0],
            Landmark::Nose,
            LandmarkPoint::new(Position3D::new(f64::NAN, 1.5, 0.0), 0.9),
        );
        assert_eq!(
            validator.validate_frame(&nan).unwrap_err().failure,
            ValidationFailure::NonFinite
        );

        let vis = with_point(
            &swing()[0],
            Landmark::Nose,
            LandmarkPoint::new(Position3D::new(0.0, 1.5, 0.2), 1.2),
        );
        assert!(matches!(
            validator.validate_frame(&vis).unwrap_err().failure,
            ValidationFailure::VisibilityOutOfRange { .. }
        ));
    }

    #[test]
    fn test_displacement_scales_with_gap() {
        let validator = FrameValidator::new(ValidatorConfig {
            max_displacement_per_frame: 0.1,
            ..ValidatorConfig::default()
        });
        let frames = swing();
        let base = &frames[0];
        let moved = |index: u64| {
            let shifted = with_point(
                base,
                Landmark::Nose,
                LandmarkPoint::new(
                    Position3D::new(
                        base.position(Landmark::Nose).unwrap().x + 0.15,
                        base.position(Landmark::Nose).unwrap().y,
                        base.position(Landmark::Nose).unwrap().z,
                    ),
                    0.9,
                ),
            );
            PoseFrame::new(index, index as f64 / 60.0, shifted.landmarks().clone())
        };

        let err = validator.validate_transition(base, &moved(1)).unwrap_err();
        assert!(matches!(err.failure, ValidationFailure::Displacement { .. }));
        assert_eq!(err.landmark, Some(Landmark::Nose));

        assert!(validator.validate_transition(base, &moved(2)).is_ok());
    }

    #[test]
    fn test_ordering_checks() {
        let validator = FrameValidator::default();
        let frames = swing();
        let err = validator
            .validate_transition(&frames[3], &frames[2])
            .unwrap_err();
        assert!(matches!(
            err.failure,
            ValidationFailure::NonMonotonicIndex { previous: 3 }
        ));

        let stale = PoseFrame::new(4, 0.0, frames[4].landmarks().clone());
        let err = validator.validate_transition(&frames[3], &stale).unwrap_err();
        assert!(matches!(
            err.failure,
            ValidationFailure::NonMonotonicTimestamp { .. }
        ));
    }

    #[test]
    fn test_short_sequence_fails() {
        let validator = FrameValidator::default();
        let err = validator.validate_sequence(&swing()[..5]).unwrap_err();
        assert_eq!(err.frame_index, None);
        assert_eq!(
            err.failure,
            ValidationFailure::TooFewFrames {
                required: 10,
                available: 5
            }
        );
    }

    #[test]
    fn test_partition_keeps_valid_frames() {
        let validator = FrameValidator::default();
        let mut frames = swing();
        frames[10] = frames[10].without(&[Landmark::LeftHip]);
        let duplicate = frames[20].clone();
        frames.insert(21, duplicate);

        let total = frames.len();
        let (accepted, rejected) = validator.partition(frames);
        assert_eq!(rejected.len(), 2);
        assert_eq!(accepted.len(), total - 2);
        assert_eq!(rejected[0].frame_index, Some(10));
        assert!(accepted
            .windows(2)
            .all(|w| w[0].frame_index() < w[1].frame_index()));
    }
}
