//! # Swing-Stream
//!
//! Live swing analysis bound to a session.
//!
//! Each session is owned by one tokio task. Frames are validated on
//! arrival, kept in a bounded buffer that drops the oldest frame on
//! overflow, and every `stride` accepted frames the buffered window is
//! analyzed on the blocking pool. At most one analysis runs per session;
//! when analysis latency exceeds the session budget the effective stride
//! grows, and shrinks back once latency recovers.
//!
//! ## Lifecycle
//!
//! `Created → Active → Draining → Closed`, with `Errored` reachable from
//! any non-terminal state. Terminal records are retained so that ending a
//! session twice returns the same record.

pub mod buffer;
pub mod config;
pub mod events;
pub mod manager;
pub mod stats;
pub mod worker;

pub use buffer::*;
pub use config::*;
pub use events::*;
pub use manager::*;
pub use stats::*;
pub use worker::FrameOutcome;
