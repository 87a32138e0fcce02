//! Deterministic synthetic swings.
//!
//! A parametric body model driven by keyframed poses (address, top, impact,
//! finish) and linear interpolation between them. Used for testing and
//! benchmarking the analysis stack without a pose estimator.

use nalgebra::Vector3;

use crate::types::{Handedness, Joint, Landmark, PoseFrame, Position3D};

const HIP_HEIGHT: f64 = 0.95;
const HIP_HALF_WIDTH: f64 = 0.15;
const TORSO_LENGTH: f64 = 0.5;
const SHOULDER_HALF_WIDTH: f64 = 0.2;
const ARM_LENGTH: f64 = 0.6;
const HAND_DEPTH: f64 = 0.25;
const GRIP_HALF_WIDTH: f64 = 0.02;
const HAND_LENGTH: f64 = 0.08;
const ANKLE_HALF_WIDTH: f64 = 0.25;
const ANKLE_HEIGHT: f64 = 0.08;
const VISIBILITY: f64 = 0.95;

/// Body configuration for a single instant. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    /// Arm swing angle: 0 hanging, positive raised to the trail side
    /// (backswing), negative raised to the lead side (follow-through)
    pub arm_angle: f64,
    pub shoulder_turn: f64,
    pub hip_turn: f64,
    /// Pelvis shift towards the target (meters)
    pub pelvis_shift: f64,
    pub hinge: f64,
    /// Shoulders lean away from the target
    pub side_bend: f64,
    pub knee_flex: f64,
    pub wrist_extension: f64,
}

impl BodyPose {
    pub fn address() -> Self {
        Self {
            arm_angle: 0.0,
            shoulder_turn: 0.0,
            hip_turn: 0.0,
            pelvis_shift: 0.0,
            hinge: 37.5,
            side_bend: 0.0,
            knee_flex: 25.0,
            wrist_extension: 0.0,
        }
    }

    pub fn top() -> Self {
        Self {
            arm_angle: 150.0,
            shoulder_turn: 90.0,
            hip_turn: 45.0,
            pelvis_shift: -0.04,
            ..Self::address()
        }
    }

    pub fn impact() -> Self {
        Self {
            arm_angle: 0.0,
            shoulder_turn: 5.0,
            hip_turn: -40.0,
            pelvis_shift: 0.16,
            side_bend: 10.0,
            knee_flex: 15.0,
            wrist_extension: -5.0,
            ..Self::address()
        }
    }

    pub fn finish() -> Self {
        Self {
            arm_angle: -150.0,
            shoulder_turn: -100.0,
            hip_turn: -60.0,
            pelvis_shift: 0.20,
            hinge: 20.0,
            knee_flex: 10.0,
            ..Self::address()
        }
    }

    /// Linear interpolation towards `other` (`t` in [0, 1])
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            arm_angle: mix(self.arm_angle, other.arm_angle),
            shoulder_turn: mix(self.shoulder_turn, other.shoulder_turn),
            hip_turn: mix(self.hip_turn, other.hip_turn),
            pelvis_shift: mix(self.pelvis_shift, other.pelvis_shift),
            hinge: mix(self.hinge, other.hinge),
            side_bend: mix(self.side_bend, other.side_bend),
            knee_flex: mix(self.knee_flex, other.knee_flex),
            wrist_extension: mix(self.wrist_extension, other.wrist_extension),
        }
    }

    /// Render the pose as a full 19-landmark frame
    pub fn to_frame(&self, frame_index: u64, timestamp: f64, handedness: Handedness) -> PoseFrame {
        let s = handedness.target_sign();
        let lateral = |v: f64| Vector3::new(s * v, 0.0, 0.0);

        let hip_center = Vector3::new(s * self.pelvis_shift, HIP_HEIGHT, 0.0);
        let hip_axis = turned(self.hip_turn, s) * HIP_HALF_WIDTH;
        let lead_hip = hip_center + hip_axis;
        let trail_hip = hip_center - hip_axis;

        let (hinge, bend) = (self.hinge.to_radians(), self.side_bend.to_radians());
        let torso = Vector3::new(
            -s * bend.sin(),
            bend.cos() * hinge.cos(),
            bend.cos() * hinge.sin(),
        ) * TORSO_LENGTH;
        let shoulder_center = hip_center + torso;
        let shoulder_axis = turned(self.shoulder_turn, s) * SHOULDER_HALF_WIDTH;
        let lead_shoulder = shoulder_center + shoulder_axis;
        let trail_shoulder = shoulder_center - shoulder_axis;

        let alpha = self.arm_angle.to_radians();
        let hands = shoulder_center
            + Vector3::new(-s * alpha.sin(), -alpha.cos(), 0.0) * ARM_LENGTH
            + Vector3::new(0.0, 0.0, HAND_DEPTH);
        let lead_wrist = hands + lateral(GRIP_HALF_WIDTH);
        let trail_wrist = hands - lateral(GRIP_HALF_WIDTH);
        let lead_elbow = (lead_shoulder + lead_wrist) / 2.0;
        let trail_elbow = (trail_shoulder + trail_wrist) / 2.0;

        let lead_forearm = (lead_wrist - lead_elbow).normalize();
        let dorsal = trail_shoulder - lead_shoulder;
        let dorsal = (dorsal - lead_forearm * dorsal.dot(&lead_forearm)).normalize();
        let ext = self.wrist_extension.to_radians();
        let lead_index =
            lead_wrist + (lead_forearm * ext.cos() + dorsal * ext.sin()) * HAND_LENGTH;
        let trail_index = trail_wrist + (trail_wrist - trail_elbow).normalize() * HAND_LENGTH;

        let lead_ankle = Vector3::new(s * ANKLE_HALF_WIDTH, ANKLE_HEIGHT, 0.0);
        let trail_ankle = Vector3::new(-s * ANKLE_HALF_WIDTH, ANKLE_HEIGHT, 0.0);
        let lead_knee = knee(&lead_hip, &lead_ankle, self.knee_flex);
        let trail_knee = knee(&trail_hip, &trail_ankle, self.knee_flex);

        let nose = shoulder_center + torso.normalize() * 0.25 + Vector3::new(0.0, 0.0, 0.08);

        let sided = [
            (Joint::Shoulder, lead_shoulder, trail_shoulder),
            (Joint::Elbow, lead_elbow, trail_elbow),
            (Joint::Wrist, lead_wrist, trail_wrist),
            (Joint::Index, lead_index, trail_index),
            (Joint::Hip, lead_hip, trail_hip),
            (Joint::Knee, lead_knee, trail_knee),
            (Joint::Ankle, lead_ankle, trail_ankle),
            (
                Joint::Heel,
                lead_ankle + Vector3::new(0.0, -0.05, -0.06),
                trail_ankle + Vector3::new(0.0, -0.05, -0.06),
            ),
            (
                Joint::FootIndex,
                lead_ankle + Vector3::new(0.0, -0.06, 0.18),
                trail_ankle + Vector3::new(0.0, -0.06, 0.18),
            ),
        ];

        let mut points: Vec<(Landmark, Position3D, f64)> =
            vec![(Landmark::Nose, Position3D::from_vector(nose), VISIBILITY)];
        for (joint, lead, trail) in sided {
            points.push((handedness.lead(joint), Position3D::from_vector(lead), VISIBILITY));
            points.push((handedness.trail(joint), Position3D::from_vector(trail), VISIBILITY));
        }

        PoseFrame::from_points(frame_index, timestamp, points)
    }
}

/// Unit trail→lead axis rotated by `degrees` in the horizontal plane
fn turned(degrees: f64, s: f64) -> Vector3<f64> {
    let r = degrees.to_radians();
    Vector3::new(s * r.cos(), 0.0, r.sin())
}

/// Knee placed so the hip-knee-ankle chain bends forward by `flex` degrees
fn knee(hip: &Vector3<f64>, ankle: &Vector3<f64>, flex: f64) -> Vector3<f64> {
    let mid = (hip + ankle) / 2.0;
    let leg = hip - ankle;
    let half = leg.norm() / 2.0;
    if flex <= 0.0 || half < 1e-9 {
        return mid;
    }
    let axis = leg / (2.0 * half);
    let forward = Vector3::z() - axis * axis.z;
    let interior = (180.0 - flex).to_radians();
    mid + forward.normalize() * (half / (interior / 2.0).tan())
}

/// Keyframed swing generator
#[derive(Debug, Clone)]
pub struct SyntheticSwing {
    pub handedness: Handedness,
    pub frame_rate: f64,
    pub first_index: u64,
    pub total_frames: u64,
    keyframes: Vec<(u64, BodyPose)>,
}

impl Default for SyntheticSwing {
    /// Iron swing at 60 fps: address held to frame 10, top at 40, impact
    /// at 55, finish at 75, held to frame 90
    fn default() -> Self {
        Self {
            handedness: Handedness::Right,
            frame_rate: 60.0,
            first_index: 0,
            total_frames: 91,
            keyframes: vec![
                (0, BodyPose::address()),
                (10, BodyPose::address()),
                (40, BodyPose::top()),
                (55, BodyPose::impact()),
                (75, BodyPose::finish()),
            ],
        }
    }
}

impl SyntheticSwing {
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    /// Cut the swing after `frames` frames
    pub fn truncated(mut self, frames: u64) -> Self {
        self.total_frames = frames.min(self.total_frames);
        self
    }

    /// Offset the producer's frame indices
    pub fn starting_at(mut self, first_index: u64) -> Self {
        self.first_index = first_index;
        self
    }

    /// Replace the pose at the top of the backswing
    pub fn with_top(self, pose: BodyPose) -> Self {
        self.with_keyframe(40, pose)
    }

    pub fn with_impact(self, pose: BodyPose) -> Self {
        self.with_keyframe(55, pose)
    }

    /// Insert or replace the keyframe at `frame`
    pub fn with_keyframe(mut self, frame: u64, pose: BodyPose) -> Self {
        match self.keyframes.binary_search_by_key(&frame, |(f, _)| *f) {
            Ok(pos) => self.keyframes[pos].1 = pose,
            Err(pos) => self.keyframes.insert(pos, (frame, pose)),
        }
        self
    }

    /// Interpolated pose at local frame `frame`
    pub fn pose_at(&self, frame: u64) -> BodyPose {
        let Some(&(first_frame, first_pose)) = self.keyframes.first() else {
            return BodyPose::address();
        };
        if frame <= first_frame {
            return first_pose;
        }
        for pair in self.keyframes.windows(2) {
            let (f0, p0) = pair[0];
            let (f1, p1) = pair[1];
            if frame <= f1 {
                let t = (frame - f0) as f64 / (f1 - f0).max(1) as f64;
                return p0.lerp(&p1, t);
            }
        }
        self.keyframes
            .last()
            .map(|(_, pose)| *pose)
            .unwrap_or(first_pose)
    }

    pub fn frames(&self) -> Vec<PoseFrame> {
        (0..self.total_frames)
            .map(|local| {
                let index = self.first_index + local;
                let timestamp = index as f64 / self.frame_rate;
                self.pose_at(local)
                    .to_frame(index, timestamp, self.handedness)
            })
            .collect()
    }
}
