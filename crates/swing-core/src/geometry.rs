//! Geometric utilities for joint angles and body rotations.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::types::Position3D;

const EPSILON: f64 = 1e-10;

/// Axis-aligned bounding box in the body-centered frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3D {
    pub min: Position3D,
    pub max: Position3D,
}

impl BoundingBox3D {
    pub fn new(min: Position3D, max: Position3D) -> Self {
        Self { min, max }
    }

    /// Physical capture volume around a standing player:
    /// ±2 m horizontally and in depth, −1..3 m vertically
    pub fn capture_volume() -> Self {
        Self::new(
            Position3D::new(-2.0, -1.0, -2.0),
            Position3D::new(2.0, 3.0, 2.0),
        )
    }

    pub fn contains(&self, point: &Position3D) -> bool {
        self.violation(point).is_none()
    }

    /// First axis on which `point` lies outside the box, as
    /// `(axis, value, min, max)`
    pub fn violation(&self, point: &Position3D) -> Option<(char, f64, f64, f64)> {
        let axes = [
            ('x', point.x, self.min.x, self.max.x),
            ('y', point.y, self.min.y, self.max.y),
            ('z', point.z, self.min.z, self.max.z),
        ];
        axes.into_iter()
            .find(|(_, value, min, max)| value < min || value > max)
    }
}

impl Default for BoundingBox3D {
    fn default() -> Self {
        Self::capture_volume()
    }
}

/// Calculate angle between two vectors (radians)
pub fn angle_between(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let dot = v1.dot(v2);
    let norms = v1.norm() * v2.norm();
    if norms < EPSILON {
        0.0
    } else {
        (dot / norms).clamp(-1.0, 1.0).acos()
    }
}

/// Interior angle at `vertex` formed by `a` and `b`, in degrees.
///
/// Returns `None` when either segment is degenerate.
pub fn joint_angle_deg(a: &Vector3<f64>, vertex: &Vector3<f64>, b: &Vector3<f64>) -> Option<f64> {
    let v1 = a - vertex;
    let v2 = b - vertex;
    if v1.norm() < EPSILON || v2.norm() < EPSILON {
        return None;
    }
    Some(angle_between(&v1, &v2).to_degrees())
}

/// Elevation of `v` above the horizontal plane, in degrees (−90..90)
pub fn elevation_deg(v: &Vector3<f64>) -> Option<f64> {
    let norm = v.norm();
    if norm < EPSILON {
        return None;
    }
    Some((v.y / norm).clamp(-1.0, 1.0).asin().to_degrees())
}

/// Angle of `v` from the vertical axis, in degrees (0..180)
pub fn tilt_from_vertical_deg(v: &Vector3<f64>) -> Option<f64> {
    if v.norm() < EPSILON {
        return None;
    }
    Some(angle_between(v, &Vector3::y()).to_degrees())
}

/// Heading of `v` in the horizontal (x-z) plane, measured from the
/// target-line axis towards +z, in degrees (−180..180).
///
/// `target_sign` mirrors the x axis for left-handed players.
pub fn horizontal_heading_deg(v: &Vector3<f64>, target_sign: f64) -> Option<f64> {
    let x = v.x * target_sign;
    if x.abs() < EPSILON && v.z.abs() < EPSILON {
        return None;
    }
    Some(v.z.atan2(x).to_degrees())
}

/// Signed angle from `reference` to `v`, where the positive direction is
/// given by `positive` (projected orthogonally onto `reference`). Degrees.
pub fn signed_angle_deg(
    reference: &Vector3<f64>,
    v: &Vector3<f64>,
    positive: &Vector3<f64>,
) -> Option<f64> {
    let r_norm = reference.norm();
    if r_norm < EPSILON || v.norm() < EPSILON {
        return None;
    }
    let r = reference / r_norm;
    let ortho = positive - r * positive.dot(&r);
    let o_norm = ortho.norm();
    if o_norm < EPSILON {
        return None;
    }
    let o = ortho / o_norm;
    Some(v.dot(&o).atan2(v.dot(&r)).to_degrees())
}

/// Mean of the available points, or `None` when none are available
pub fn centroid<I>(points: I) -> Option<Position3D>
where
    I: IntoIterator<Item = Position3D>,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p.to_vector();
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(Position3D::from_vector(sum / count as f64))
    }
}
