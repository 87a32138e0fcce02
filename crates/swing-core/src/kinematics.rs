//! Per-frame body kinematics derived from landmark geometry.
//!
//! Every function returns `None` when a landmark it needs is missing, so a
//! single undetected joint never blocks unrelated measurements.

use nalgebra::Vector3;

use crate::geometry::{
    centroid, elevation_deg, horizontal_heading_deg, joint_angle_deg, signed_angle_deg,
    tilt_from_vertical_deg,
};
use crate::types::{Handedness, Joint, Landmark, PoseFrame, Position3D};

/// Body kinematics view over a single frame for a given handedness
#[derive(Debug, Clone, Copy)]
pub struct BodyFrame<'a> {
    frame: &'a PoseFrame,
    handedness: Handedness,
}

impl<'a> BodyFrame<'a> {
    pub fn new(frame: &'a PoseFrame, handedness: Handedness) -> Self {
        Self { frame, handedness }
    }

    pub fn frame(&self) -> &'a PoseFrame {
        self.frame
    }

    fn lead(&self, joint: Joint) -> Option<Vector3<f64>> {
        self.frame.vector(self.handedness.lead(joint))
    }

    fn trail(&self, joint: Joint) -> Option<Vector3<f64>> {
        self.frame.vector(self.handedness.trail(joint))
    }

    fn midpoint(&self, joint: Joint) -> Option<Vector3<f64>> {
        Some((self.lead(joint)? + self.trail(joint)?) / 2.0)
    }

    fn target_sign(&self) -> f64 {
        self.handedness.target_sign()
    }

    pub fn hip_center(&self) -> Option<Vector3<f64>> {
        self.midpoint(Joint::Hip)
    }

    pub fn shoulder_center(&self) -> Option<Vector3<f64>> {
        self.midpoint(Joint::Shoulder)
    }

    /// Mean of the detected wrists; one wrist is enough
    pub fn hand_center(&self) -> Option<Vector3<f64>> {
        let wrists = [Joint::Wrist]
            .iter()
            .flat_map(|j| [self.handedness.lead(*j), self.handedness.trail(*j)])
            .filter_map(|lm| self.frame.position(lm));
        centroid(wrists).map(|p| p.to_vector())
    }

    /// Hand height relative to the hip center (positive above the hips)
    pub fn hand_height_above_hips(&self) -> Option<f64> {
        Some(self.hand_center()?.y - self.hip_center()?.y)
    }

    /// Elevation of the lead arm (shoulder → wrist) above horizontal
    pub fn lead_arm_elevation(&self) -> Option<f64> {
        elevation_deg(&(self.lead(Joint::Wrist)? - self.lead(Joint::Shoulder)?))
    }

    /// Elevation of the trail arm (shoulder → wrist) above horizontal
    pub fn trail_arm_elevation(&self) -> Option<f64> {
        elevation_deg(&(self.trail(Joint::Wrist)? - self.trail(Joint::Shoulder)?))
    }

    /// Rotation of a trail→lead segment in the horizontal plane. Zero is
    /// square to the target line; positive is turned away from the target
    /// (backswing), negative is open (follow-through).
    fn segment_rotation(&self, joint: Joint) -> Option<f64> {
        let line = self.lead(joint)? - self.trail(joint)?;
        horizontal_heading_deg(&line, self.target_sign())
    }

    pub fn shoulder_rotation(&self) -> Option<f64> {
        self.segment_rotation(Joint::Shoulder)
    }

    pub fn hip_rotation(&self) -> Option<f64> {
        self.segment_rotation(Joint::Hip)
    }

    /// Shoulder-minus-hip rotation ("X-Factor")
    pub fn x_factor(&self) -> Option<f64> {
        Some(self.shoulder_rotation()? - self.hip_rotation()?)
    }

    /// Forward bend of the torso (hip center → shoulder center) from vertical
    pub fn hip_hinge(&self) -> Option<f64> {
        tilt_from_vertical_deg(&(self.shoulder_center()? - self.hip_center()?))
    }

    /// Lateral bend of the torso in the frontal plane, positive when the
    /// shoulders lean away from the target
    pub fn spine_side_bend(&self) -> Option<f64> {
        let torso = self.shoulder_center()? - self.hip_center()?;
        let lateral = -torso.x * self.target_sign();
        if lateral.abs() < 1e-10 && torso.y.abs() < 1e-10 {
            return None;
        }
        Some(lateral.atan2(torso.y).to_degrees())
    }

    /// Flexion of the lead knee: 0 when the leg is straight
    pub fn lead_knee_flex(&self) -> Option<f64> {
        let angle = joint_angle_deg(
            &self.lead(Joint::Hip)?,
            &self.lead(Joint::Knee)?,
            &self.lead(Joint::Ankle)?,
        )?;
        Some(180.0 - angle)
    }

    /// Interior angle of the lead elbow: 180 when the arm is straight
    pub fn lead_elbow_angle(&self) -> Option<f64> {
        joint_angle_deg(
            &self.lead(Joint::Shoulder)?,
            &self.lead(Joint::Elbow)?,
            &self.lead(Joint::Wrist)?,
        )
    }

    /// Signed lead-wrist extension: angle between the forearm (elbow →
    /// wrist) and the hand (wrist → index). Positive bends the hand towards
    /// the trail shoulder side of the forearm (extension, "cupped"),
    /// negative bends it away (flexion, "bowed").
    pub fn lead_wrist_extension(&self) -> Option<f64> {
        let elbow = self.lead(Joint::Elbow)?;
        let wrist = self.lead(Joint::Wrist)?;
        let index = self.lead(Joint::Index)?;
        let dorsal = self.trail(Joint::Shoulder)? - self.lead(Joint::Shoulder)?;
        signed_angle_deg(&(wrist - elbow), &(index - wrist), &dorsal)
    }

    /// Centre-of-mass proxy: mean of the detected hips and shoulders.
    /// Requires both hips.
    pub fn center_of_mass(&self) -> Option<Position3D> {
        self.hip_center()?;
        let trunk = [
            Landmark::LeftHip,
            Landmark::RightHip,
            Landmark::LeftShoulder,
            Landmark::RightShoulder,
        ];
        centroid(trunk.iter().filter_map(|lm| self.frame.position(*lm)))
    }

    /// Signed stance width along the target line (lead ankle − trail ankle)
    pub fn stance_width(&self) -> Option<f64> {
        let span = (self.lead(Joint::Ankle)?.x - self.trail(Joint::Ankle)?.x) * self.target_sign();
        if span < 1e-3 {
            None
        } else {
            Some(span)
        }
    }

    /// Share of body weight over the lead foot, 0–100 %, inferred from the
    /// centre-of-mass offset along the stance
    pub fn lead_weight_share(&self) -> Option<f64> {
        let com = self.center_of_mass()?;
        let span = self.stance_width()?;
        let trail_x = self.trail(Joint::Ankle)?.x;
        let offset = (com.x - trail_x) * self.target_sign();
        Some((offset / span).clamp(0.0, 1.0) * 100.0)
    }

    /// Hip center shift towards the target relative to `reference`, as a
    /// percentage of the reference stance width
    pub fn hip_shift_from(&self, reference: &BodyFrame<'_>) -> Option<f64> {
        let span = reference.stance_width()?;
        let shift = (self.hip_center()?.x - reference.hip_center()?.x) * self.target_sign();
        Some(shift / span * 100.0)
    }
}

/// Hand speed between two frames in units per second, accounting for
/// index gaps
pub fn hand_speed(
    previous: &PoseFrame,
    current: &PoseFrame,
    handedness: Handedness,
    frame_rate: f64,
) -> Option<f64> {
    let a = BodyFrame::new(previous, handedness).hand_center()?;
    let b = BodyFrame::new(current, handedness).hand_center()?;
    let gap = current.frame_index().checked_sub(previous.frame_index())?.max(1) as f64;
    Some((b - a).norm() * frame_rate / gap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{BodyPose, SyntheticSwing};

    #[test]
    fn test_address_pose_kinematics() {
        let frame = BodyPose::address().to_frame(0, 0.0, Handedness::Right);
        let body = BodyFrame::new(&frame, Handedness::Right);

        assert!(body.shoulder_rotation().unwrap().abs() < 1e-6);
        assert!(body.hip_rotation().unwrap().abs() < 1e-6);
        assert!((body.hip_hinge().unwrap() - 37.5).abs() < 1e-6);
        assert!((body.lead_weight_share().unwrap() - 50.0).abs() < 1e-6);
        assert!(body.hand_height_above_hips().unwrap() < 0.0);
        assert!(body.lead_arm_elevation().unwrap() < -45.0);
    }

    #[test]
    fn test_rotation_reads_the_same_for_both_hands() {
        let pose = BodyPose {
            shoulder_turn: 80.0,
            hip_turn: 40.0,
            ..BodyPose::address()
        };

        for handedness in [Handedness::Right, Handedness::Left] {
            let frame = pose.to_frame(0, 0.0, handedness);
            let body = BodyFrame::new(&frame, handedness);
            assert!((body.shoulder_rotation().unwrap() - 80.0).abs() < 1e-6);
            assert!((body.hip_rotation().unwrap() - 40.0).abs() < 1e-6);
            assert!((body.x_factor().unwrap() - 40.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_wrist_extension_sign() {
        for (ext, expected) in [(25.0, 25.0), (-10.0, -10.0), (0.0, 0.0)] {
            let pose = BodyPose {
                wrist_extension: ext,
                ..BodyPose::top()
            };
            let frame = pose.to_frame(0, 0.0, Handedness::Right);
            let measured = BodyFrame::new(&frame, Handedness::Right)
                .lead_wrist_extension()
                .unwrap();
            assert!((measured - expected).abs() < 1e-6, "{measured} vs {expected}");
        }
    }

    #[test]
    fn test_missing_knee_only_blocks_knee_metric() {
        let frame = BodyPose::address()
            .to_frame(0, 0.0, Handedness::Right)
            .without(&[Landmark::LeftKnee]);
        let body = BodyFrame::new(&frame, Handedness::Right);
        assert!(body.lead_knee_flex().is_none());
        assert!(body.shoulder_rotation().is_some());
        assert!(body.hip_hinge().is_some());
    }

    #[test]
    fn test_hand_speed_scales_with_gap() {
        let swing = SyntheticSwing::default().frames();
        let a = &swing[20];
        let b = &swing[21];
        let speed = hand_speed(a, b, Handedness::Right, 60.0).unwrap();
        assert!(speed > 0.0);

        let c = &swing[22];
        let skip = hand_speed(a, c, Handedness::Right, 60.0).unwrap();
        assert!(skip > 0.0);
    }
}
