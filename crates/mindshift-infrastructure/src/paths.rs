//! Path management for mindshift configuration and log files.
//!
//! Paths are resolved with the `dirs` crate so they follow the platform
//! convention (XDG on Linux, `Application Support` on macOS, `AppData` on
//! Windows).
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/mindshift/          # Config directory
//! ├── config.toml               # Application configuration
//! └── logs/                     # Application logs
//!     └── mindshift.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "mindshift";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find the platform config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for mindshift_core::ShiftError {
    fn from(err: PathError) -> Self {
        mindshift_core::ShiftError::config(err.to_string())
    }
}

/// Path helpers for mindshift.
///
/// An explicit base directory replaces the platform config directory, which
/// keeps tests and portable installs out of the user's home.
#[derive(Debug, Clone, Default)]
pub struct MindshiftPaths {
    base: Option<PathBuf>,
}

impl MindshiftPaths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the mindshift configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: the base directory if one was given, otherwise
    ///   `<platform config dir>/mindshift`
    /// - `Err(PathError::ConfigDirNotFound)`: no base and no platform directory
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the directory daily log files are written to.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
