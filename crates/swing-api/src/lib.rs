//! # Swing-API
//!
//! Axum server exposing batch analysis and streaming sessions.
//!
//! ## Endpoints
//!
//! ### WebSocket
//! - `/ws/sessions` - Streaming session: start, push frames, receive
//!   incremental results, alerts and lifecycle events
//!
//! ### REST
//! - `POST /api/v1/analyze` - Batch analysis of a complete swing
//! - `POST /api/v1/sessions` - Start a streaming session
//! - `POST /api/v1/sessions/:id/frames` - Push frames to a session
//! - `GET /api/v1/sessions/:id/stats` - Session statistics
//! - `DELETE /api/v1/sessions/:id` - End (or `?cancel=true`) a session
//! - `GET /api/v1/health` - Health check

pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use self::config::*;
pub use error::*;
pub use server::*;
pub use state::*;
