//! Session and manager configuration.

use serde::{Deserialize, Serialize};
use swing_analysis::ValidatorConfig;
use swing_core::{Error, Result};

/// Effective configuration of one streaming session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Accepted frames between analysis triggers
    pub stride: usize,

    /// Minimum severity for a fault alert
    pub feedback_threshold: f64,

    /// Target analysis latency (milliseconds)
    pub latency_budget_ms: u64,

    /// Frames kept in the window (150 ≈ 2.5 s at 60 fps)
    pub buffer_capacity: usize,

    pub frame_rate: f64,

    /// Consecutive rejected frames that put the session in error
    pub max_consecutive_rejections: usize,

    /// Upper bound of the adaptive stride, as a multiple of `stride`
    pub max_stride_multiplier: usize,

    /// Capacity of the outbound event queue; one slot is held for the
    /// closing event
    pub event_queue_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stride: 5,
            feedback_threshold: 0.5,
            latency_budget_ms: 50,
            buffer_capacity: 150,
            frame_rate: 60.0,
            max_consecutive_rejections: 30,
            max_stride_multiplier: 4,
            event_queue_size: 256,
        }
    }
}

impl SessionConfig {
    /// Apply caller overrides and validate the outcome
    pub fn with_overrides(&self, overrides: &SessionOverrides) -> Result<Self> {
        let mut config = self.clone();
        if let Some(stride) = overrides.stride {
            config.stride = stride;
        }
        if let Some(threshold) = overrides.feedback_threshold {
            config.feedback_threshold = threshold;
        }
        if let Some(budget) = overrides.latency_budget_ms {
            config.latency_budget_ms = budget;
        }
        if let Some(capacity) = overrides.buffer_capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(rate) = overrides.frame_rate {
            config.frame_rate = rate;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::Config("stride must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.feedback_threshold) {
            return Err(Error::Config(format!(
                "feedback threshold {} outside [0, 1]",
                self.feedback_threshold
            )));
        }
        if self.latency_budget_ms == 0 {
            return Err(Error::Config("latency budget must be positive".into()));
        }
        if self.buffer_capacity < 2 {
            return Err(Error::Config(format!(
                "buffer capacity {} too small",
                self.buffer_capacity
            )));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(Error::Config(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.event_queue_size == 0 || self.max_consecutive_rejections == 0 {
            return Err(Error::Config("queue size and rejection limit must be positive".into()));
        }
        Ok(())
    }

    /// Largest stride adaptive sampling may reach
    pub fn max_stride(&self) -> usize {
        self.stride * self.max_stride_multiplier.max(1)
    }
}

/// Per-session overrides supplied at session start; all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOverrides {
    pub stride: Option<usize>,
    pub feedback_threshold: Option<f64>,
    pub latency_budget_ms: Option<u64>,
    pub buffer_capacity: Option<usize>,
    pub frame_rate: Option<f64>,
}

/// Session manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Defaults for new sessions
    pub session: SessionConfig,

    /// Per-frame checks applied on ingestion
    pub validator: ValidatorConfig,

    /// Inactivity before a session is drained (milliseconds)
    pub idle_timeout_ms: u64,

    /// Reaper scan interval (milliseconds)
    pub reaper_interval_ms: u64,

    pub max_sessions: usize,

    /// Terminal records retained for idempotent end-session
    pub terminated_history: usize,

    /// Reject unrecognized club names at session start
    pub strict_club: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            validator: ValidatorConfig::default(),
            idle_timeout_ms: 5_000,
            reaper_interval_ms: 1_000,
            max_sessions: 1_000,
            terminated_history: 1_024,
            strict_club: false,
        }
    }
}
