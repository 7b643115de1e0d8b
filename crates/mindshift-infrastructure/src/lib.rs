//! Infrastructure layer for Mindshift: HTTP clients for the remote session
//! authority and the transcription service, plus configuration loading.

pub mod config_service;
pub mod http_authority;
pub mod paths;
pub mod transcription;

pub use config_service::ConfigService;
pub use http_authority::HttpSessionAuthority;
pub use paths::{MindshiftPaths, PathError};
pub use transcription::{HealthStatus, HttpTranscriber, Transcription};
