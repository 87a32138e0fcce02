//! # Swing-Analysis
//!
//! The deterministic analysis stages that turn a validated frame sequence
//! into a structured swing report:
//!
//! 1. **Validator** - rejects malformed or physically impossible frames
//! 2. **Phase classifier** - segments the sequence into P1-P10
//! 3. **KPI extractor** - measures the metric catalogue on each phase
//! 4. **Diagnosis engine** - evaluates measurements against club rules
//!
//! [`AnalysisPipeline`] runs the four stages once over a complete
//! sequence and also serves as the [`SwingAnalyzer`] behind streaming
//! sessions.
//!
//! ## Severity
//!
//! A rule that fires scores its deviation beyond the nearest boundary:
//!
//! ```text
//! severity = clamp(excess / (span × tolerance), 0, 1) × weight × multiplier
//! ```
//!
//! clamped again to `[0, 1]`. A value exactly on the boundary never fires.

pub mod catalogue;
pub mod diagnosis;
pub mod filtering;
pub mod kpi;
pub mod phase;
pub mod pipeline;
pub mod result;
pub mod rules;
pub mod validator;

pub use catalogue::*;
pub use diagnosis::*;
pub use filtering::*;
pub use kpi::*;
pub use phase::*;
pub use pipeline::*;
pub use result::*;
pub use rules::*;
pub use validator::*;
