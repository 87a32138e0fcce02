//! # Swing-Core
//!
//! Core types and utilities for the swing analysis system: pose frames and
//! body landmarks, the P1–P10 phase model, club classification, and the
//! geometric primitives used to turn 3D keypoints into joint angles and
//! body rotations.
//!
//! ## Coordinate frame
//!
//! Frames are expressed in a body-centered frame (units are meters):
//!
//! - **x**: along the target line, positive towards the target of a
//!   right-handed player
//! - **y**: vertical, positive up, ground near `0`
//! - **z**: depth, positive from the player towards the ball
//!
//! Left-handed players use the same frame; [`Handedness`] mirrors the
//! lateral quantities so that every measurement reads the same for both.

pub mod club;
pub mod error;
pub mod geometry;
pub mod kinematics;
pub mod synthetic;
pub mod types;

pub use club::*;
pub use error::{Error, Result, ValidationError, ValidationFailure};
pub use geometry::*;
pub use kinematics::*;
pub use types::*;
