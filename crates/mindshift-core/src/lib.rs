//! Domain core of the Mindshift session protocol engine.
//!
//! Holds the step model and its registry, the response classifier and
//! modality router, session state with its bounded undo history, and the
//! collaborator traits (remote authority, speech) the orchestrator drives.

pub mod authority;
pub mod config;
pub mod error;
pub mod session;
pub mod speech;
pub mod step;

// Re-export common error type
pub use error::{Result, ShiftError};
