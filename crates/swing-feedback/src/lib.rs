//! # Swing-Feedback
//!
//! Coaching feedback for detected swing faults.
//!
//! The analysis core never produces prose. This crate turns the most
//! severe faults of a result into coaching text through a
//! [`FeedbackGenerator`]:
//!
//! - [`TemplateCoach`]: deterministic, offline, keyed by each rule's
//!   feedback key
//! - [`PromptedCoach`]: formats a prompt for an external text service and
//!   parses its reply
//!
//! [`FeedbackService`] applies top-N selection and a timeout; a failing
//! generator yields no feedback but never affects the structured result.

pub mod agent;
pub mod coach;
pub mod prompts;
pub mod service;

pub use agent::*;
pub use coach::*;
pub use prompts::*;
pub use service::*;
