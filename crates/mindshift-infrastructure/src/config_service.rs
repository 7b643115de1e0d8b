//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `config.toml` (by default under the platform
//! config directory, see [`MindshiftPaths`]) and applies environment
//! overrides on top. A missing file yields the defaults.

use crate::paths::MindshiftPaths;
use mindshift_core::config::AppConfig;
use mindshift_core::error::{Result, ShiftError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub const ENV_AUTHORITY_URL: &str = "MINDSHIFT_AUTHORITY_URL";
pub const ENV_AUTHORITY_API_KEY: &str = "MINDSHIFT_AUTHORITY_API_KEY";
pub const ENV_TRANSCRIBE_URL: &str = "MINDSHIFT_TRANSCRIBE_URL";
pub const ENV_TRANSCRIBE_API_KEY: &str = "MINDSHIFT_TRANSCRIBE_API_KEY";
pub const ENV_SPEECH: &str = "MINDSHIFT_SPEECH";

/// Configuration service that loads and caches the application configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `<config dir>/mindshift/config.toml`.
    pub fn new() -> Result<Self> {
        let path = MindshiftPaths::default().config_file()?;
        Ok(Self::with_path(path))
    }

    /// Creates a service reading an explicit config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading it if not cached.
    ///
    /// Environment overrides are applied on every load.
    pub fn get_config(&self) -> Result<AppConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut loaded = self.load_file()?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());
        tracing::debug!(path = %self.path.display(), config = %loaded.summary(), "Configuration loaded");

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Writes `config` to the config file, creating its directory if needed.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(config)?)?;
        self.invalidate_cache();
        Ok(())
    }

    fn load_file(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        toml::from_str(&raw).map_err(|e| {
            ShiftError::config(format!("Invalid config file {}: {}", self.path.display(), e))
        })
    }
}

/// Applies `MINDSHIFT_*` overrides read through `lookup`.
///
/// Empty values are ignored. `MINDSHIFT_SPEECH` accepts 1/0, true/false,
/// on/off.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = get(ENV_AUTHORITY_URL) {
        config.authority.base_url = url;
    }
    if let Some(key) = get(ENV_AUTHORITY_API_KEY) {
        config.authority.api_key = Some(key);
    }
    if let Some(url) = get(ENV_TRANSCRIBE_URL) {
        config.transcription.base_url = url;
    }
    if let Some(key) = get(ENV_TRANSCRIBE_API_KEY) {
        config.transcription.api_key = Some(key);
    }
    if let Some(raw) = get(ENV_SPEECH) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => config.orchestrator.speech.enabled = true,
            "0" | "false" | "off" | "no" => config.orchestrator.speech.enabled = false,
            other => tracing::warn!(value = other, "Ignoring unrecognized {}", ENV_SPEECH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let service = ConfigService::with_path(temp.path().join("config.toml"));
        let config = service.load_file().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempfile::tempdir().unwrap();
        let service = ConfigService::with_path(temp.path().join("nested").join("config.toml"));

        let mut config = AppConfig::default();
        config.orchestrator.history_capacity = 5;
        config.authority.base_url = "https://shift.example.com".to_string();
        service.save(&config).unwrap();

        let loaded = service.load_file().unwrap();
        assert_eq!(loaded.orchestrator.history_capacity, 5);
        assert_eq!(loaded.authority.base_url, "https://shift.example.com");
    }

    #[test]
    fn test_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[orchestrator.speech]\nenabled = true\n\n[rate_limit]\nmax_requests = 5\n",
        )
        .unwrap();

        let loaded = ConfigService::with_path(path).load_file().unwrap();
        assert!(loaded.orchestrator.speech.enabled);
        assert_eq!(loaded.rate_limit.max_requests, 5);
        assert_eq!(loaded.transcription, AppConfig::default().transcription);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[authority\nbase_url = 3").unwrap();

        let err = ConfigService::with_path(path).load_file().unwrap_err();
        assert!(matches!(err, ShiftError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                (ENV_AUTHORITY_URL, "https://authority.example.com"),
                (ENV_AUTHORITY_API_KEY, "secret"),
                (ENV_TRANSCRIBE_URL, ""),
                (ENV_SPEECH, "on"),
            ]),
        );

        assert_eq!(config.authority.base_url, "https://authority.example.com");
        assert_eq!(config.authority.api_key.as_deref(), Some("secret"));
        assert_eq!(config.transcription.base_url, "http://localhost:8000");
        assert!(config.orchestrator.speech.enabled);

        apply_env_overrides(&mut config, lookup(&[(ENV_SPEECH, "maybe")]));
        assert!(config.orchestrator.speech.enabled);
    }
}
