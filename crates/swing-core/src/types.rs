//! Fundamental types for the swing analysis system.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Session identifier, shared by batch requests and streaming sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning user of a streaming session (issued by the external auth system)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock timestamp with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// 3D position in the body-centered frame (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Named body landmarks supplied by the upstream pose estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftIndex,
    RightIndex,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Landmark {
    pub const COUNT: usize = 19;

    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::Nose,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftIndex,
        Landmark::RightIndex,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
        Landmark::LeftHeel,
        Landmark::RightHeel,
        Landmark::LeftFootIndex,
        Landmark::RightFootIndex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftWrist => "left_wrist",
            Landmark::RightWrist => "right_wrist",
            Landmark::LeftIndex => "left_index",
            Landmark::RightIndex => "right_index",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
            Landmark::LeftHeel => "left_heel",
            Landmark::RightHeel => "right_heel",
            Landmark::LeftFootIndex => "left_foot_index",
            Landmark::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side-independent joint, resolved to a [`Landmark`] through [`Handedness`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
    Index,
    Hip,
    Knee,
    Ankle,
    Heel,
    FootIndex,
}

impl Joint {
    fn sides(&self) -> (Landmark, Landmark) {
        match self {
            Joint::Shoulder => (Landmark::LeftShoulder, Landmark::RightShoulder),
            Joint::Elbow => (Landmark::LeftElbow, Landmark::RightElbow),
            Joint::Wrist => (Landmark::LeftWrist, Landmark::RightWrist),
            Joint::Index => (Landmark::LeftIndex, Landmark::RightIndex),
            Joint::Hip => (Landmark::LeftHip, Landmark::RightHip),
            Joint::Knee => (Landmark::LeftKnee, Landmark::RightKnee),
            Joint::Ankle => (Landmark::LeftAnkle, Landmark::RightAnkle),
            Joint::Heel => (Landmark::LeftHeel, Landmark::RightHeel),
            Joint::FootIndex => (Landmark::LeftFootIndex, Landmark::RightFootIndex),
        }
    }
}

/// Player handedness. The lead side faces the target: left for a
/// right-handed player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl Handedness {
    pub fn lead(&self, joint: Joint) -> Landmark {
        let (left, right) = joint.sides();
        match self {
            Handedness::Right => left,
            Handedness::Left => right,
        }
    }

    pub fn trail(&self, joint: Joint) -> Landmark {
        let (left, right) = joint.sides();
        match self {
            Handedness::Right => right,
            Handedness::Left => left,
        }
    }

    /// Sign of the x axis pointing towards the target
    pub fn target_sign(&self) -> f64 {
        match self {
            Handedness::Right => 1.0,
            Handedness::Left => -1.0,
        }
    }
}

/// Detected landmark with visibility score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub position: Position3D,
    /// Visibility / detection confidence in [0, 1]
    pub visibility: f64,
}

impl LandmarkPoint {
    pub fn new(position: Position3D, visibility: f64) -> Self {
        Self {
            position,
            visibility,
        }
    }
}

/// A single frame of body keypoints. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    frame_index: u64,
    /// Seconds, monotonic within a session
    timestamp: f64,
    landmarks: BTreeMap<Landmark, LandmarkPoint>,
}

impl PoseFrame {
    pub fn new(
        frame_index: u64,
        timestamp: f64,
        landmarks: BTreeMap<Landmark, LandmarkPoint>,
    ) -> Self {
        Self {
            frame_index,
            timestamp,
            landmarks,
        }
    }

    /// Build a frame from (landmark, position, visibility) triples
    pub fn from_points<I>(frame_index: u64, timestamp: f64, points: I) -> Self
    where
        I: IntoIterator<Item = (Landmark, Position3D, f64)>,
    {
        let landmarks = points
            .into_iter()
            .map(|(landmark, position, visibility)| {
                (landmark, LandmarkPoint::new(position, visibility))
            })
            .collect();
        Self::new(frame_index, timestamp, landmarks)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn landmarks(&self) -> &BTreeMap<Landmark, LandmarkPoint> {
        &self.landmarks
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.landmarks.get(&landmark)
    }

    pub fn position(&self, landmark: Landmark) -> Option<Position3D> {
        self.landmarks.get(&landmark).map(|p| p.position)
    }

    /// Position as a vector, for geometric computations
    pub fn vector(&self, landmark: Landmark) -> Option<Vector3<f64>> {
        self.position(landmark).map(|p| p.to_vector())
    }

    pub fn contains(&self, landmark: Landmark) -> bool {
        self.landmarks.contains_key(&landmark)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Copy of this frame without the given landmarks
    pub fn without(&self, excluded: &[Landmark]) -> Self {
        let landmarks = self
            .landmarks
            .iter()
            .filter(|(lm, _)| !excluded.contains(lm))
            .map(|(lm, p)| (*lm, *p))
            .collect();
        Self::new(self.frame_index, self.timestamp, landmarks)
    }
}

/// The ten canonical P-System checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseLabel {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
}

impl PhaseLabel {
    pub const COUNT: usize = 10;

    pub const ALL: [PhaseLabel; PhaseLabel::COUNT] = [
        PhaseLabel::P1,
        PhaseLabel::P2,
        PhaseLabel::P3,
        PhaseLabel::P4,
        PhaseLabel::P5,
        PhaseLabel::P6,
        PhaseLabel::P7,
        PhaseLabel::P8,
        PhaseLabel::P9,
        PhaseLabel::P10,
    ];

    /// Zero-based ordinal (P1 = 0)
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn from_ordinal(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn code(&self) -> &'static str {
        match self {
            PhaseLabel::P1 => "p1",
            PhaseLabel::P2 => "p2",
            PhaseLabel::P3 => "p3",
            PhaseLabel::P4 => "p4",
            PhaseLabel::P5 => "p5",
            PhaseLabel::P6 => "p6",
            PhaseLabel::P7 => "p7",
            PhaseLabel::P8 => "p8",
            PhaseLabel::P9 => "p9",
            PhaseLabel::P10 => "p10",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PhaseLabel::P1 => "Address",
            PhaseLabel::P2 => "Takeaway (shaft parallel)",
            PhaseLabel::P3 => "Lead arm parallel",
            PhaseLabel::P4 => "Top of backswing",
            PhaseLabel::P5 => "Lead arm parallel (downswing)",
            PhaseLabel::P6 => "Shaft parallel (downswing)",
            PhaseLabel::P7 => "Impact",
            PhaseLabel::P8 => "Shaft parallel (follow-through)",
            PhaseLabel::P9 => "Trail arm parallel",
            PhaseLabel::P10 => "End of swing",
        }
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{} {}", self.ordinal() + 1, self.description())
    }
}

/// A located swing phase, bound to an inclusive frame-index range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingPhase {
    pub label: PhaseLabel,
    pub start_frame: u64,
    pub end_frame: u64,
}

impl SwingPhase {
    pub fn new(label: PhaseLabel, start_frame: u64, end_frame: u64) -> Self {
        Self {
            label,
            start_frame,
            end_frame,
        }
    }

    pub fn contains(&self, frame_index: u64) -> bool {
        frame_index >= self.start_frame && frame_index <= self.end_frame
    }

    pub fn frame_count(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame) + 1
    }
}

/// Check the phase ordering invariant: labels strictly increasing, start
/// indices strictly increasing, ranges well-formed and non-overlapping.
pub fn phases_are_ordered(phases: &[SwingPhase]) -> bool {
    phases.iter().all(|p| p.start_frame <= p.end_frame)
        && phases.windows(2).all(|w| {
            w[0].label < w[1].label
                && w[0].start_frame < w[1].start_frame
                && w[0].end_frame < w[1].start_frame
        })
}

/// Lifecycle state of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Draining,
    Closed,
    Errored,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Errored)
    }

    pub fn accepts_frames(&self) -> bool {
        matches!(self, SessionState::Created | SessionState::Active)
    }

    /// Legal edges of the session state machine
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (*self, next) {
            (Created, Active) | (Created, Draining) => true,
            (Active, Draining) => true,
            (Draining, Closed) => true,
            (from, Errored) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Serialize a `Duration` as fractional milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1_000.0))
    }
}
