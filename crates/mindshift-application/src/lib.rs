//! Application layer for Mindshift.
//!
//! This crate drives a session: the orchestrator coordinates the domain
//! components from `mindshift-core` with the remote authority and the speech
//! collaborators, and the audio sync controller orders text reveal and
//! auto-advance against speech playback.

pub mod audio_sync;
pub mod orchestrator;
pub mod rate_limit;
pub mod session;

pub use audio_sync::{AudioSyncController, SyncSignal};
pub use orchestrator::{SessionOrchestrator, Transition, UndoOutcome};
pub use rate_limit::{InMemoryRateLimitStore, RateLimitStore};
pub use session::{OrchestratorFactory, SessionCache};
