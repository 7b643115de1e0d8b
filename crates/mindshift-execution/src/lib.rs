//! Execution layer for Mindshift.
//!
//! Runs each session as its own task behind a serialized queue and exposes
//! protocol activity to hosts through a tracing layer.

pub mod runner;
pub mod session_service;
pub mod tracing_layer;

pub use runner::{SessionCommand, SessionHandle, SessionRunner, SessionUpdate};
pub use session_service::{OpenedSession, SessionService};
pub use tracing_layer::{SESSION_TARGET, SessionTraceEvent, SessionTraceLayer};
