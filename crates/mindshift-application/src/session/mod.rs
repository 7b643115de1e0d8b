//! Session application services.
//!
//! Construction of per-session orchestrators and the cache of live sessions.

mod cache;
mod factory;

pub use cache::SessionCache;
pub use factory::OrchestratorFactory;
