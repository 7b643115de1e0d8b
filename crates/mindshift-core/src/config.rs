//! Configuration model.
//!
//! Every field has a default so a partial (or missing) `config.toml` is valid.

use crate::session::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Root configuration loaded from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub authority: AuthorityConfig,
    pub transcription: TranscriptionConfig,
    pub rate_limit: RateLimitConfig,
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// A loggable view of the configuration with credentials masked.
    pub fn summary(&self) -> Value {
        json!({
            "authority": {
                "url": mask_url_credentials(&self.authority.url()),
                "timeout_secs": self.authority.timeout_secs,
                "auth": key_state(&self.authority.api_key),
            },
            "transcription": {
                "base_url": mask_url_credentials(&self.transcription.base_url),
                "auth": key_state(&self.transcription.api_key),
                "max_file_size_mb": self.transcription.max_file_size as f64 / (1024.0 * 1024.0),
                "allowed_formats": self.transcription.allowed_formats,
            },
            "rate_limit": {
                "max_requests": self.rate_limit.max_requests,
                "window_secs": self.rate_limit.window_secs,
            },
            "orchestrator": {
                "history_capacity": self.orchestrator.history_capacity,
                "speech_enabled": self.orchestrator.speech.enabled,
                "voice": self.orchestrator.speech.voice,
            },
        })
    }
}

fn key_state(key: &Option<String>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "set",
        _ => "unset",
    }
}

/// Hides `user:password@` in a URL.
fn mask_url_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Remote session authority endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AuthorityConfig {
    pub base_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AuthorityConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            endpoint: "/api/session".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Speech recognition service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Upload limit in bytes.
    pub max_file_size: u64,
    /// Lowercase file extensions accepted for upload.
    pub allowed_formats: Vec<String>,
    pub timeout_secs: u64,
}

impl TranscriptionConfig {
    pub fn allows_format(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_formats.iter().any(|f| *f == extension)
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            max_file_size: 10 * 1024 * 1024,
            allowed_formats: ["wav", "mp3", "ogg", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 60,
        }
    }
}

/// Request budget per user id and window.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
        }
    }
}

/// Per-session orchestrator settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub history_capacity: usize,
    pub speech: SpeechConfig,
    pub reading_delay: ReadingDelayConfig,
    pub guardrails: GuardrailConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            speech: SpeechConfig::default(),
            reading_delay: ReadingDelayConfig::default(),
            guardrails: GuardrailConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub voice: String,
    pub speed: f32,
    /// Deferred text is revealed after this long even without a speech-started signal.
    pub start_timeout_ms: u64,
}

impl SpeechConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            voice: "alloy".to_string(),
            speed: 1.0,
            start_timeout_ms: 3000,
        }
    }
}

/// Auto-advance timer used when speech output is disabled.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReadingDelayConfig {
    pub min_ms: u64,
    pub max_ms: u64,
    pub per_word_ms: u64,
}

impl ReadingDelayConfig {
    /// Word count times `per_word_ms`, clamped to `[min_ms, max_ms]`.
    pub fn delay_for(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        let max = self.max_ms.max(self.min_ms);
        Duration::from_millis(words.saturating_mul(self.per_word_ms).clamp(self.min_ms, max))
    }
}

impl Default for ReadingDelayConfig {
    fn default() -> Self {
        Self {
            min_ms: 2000,
            max_ms: 8000,
            per_word_ms: 300,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GuardrailConfig {
    pub max_input_chars: usize,
    pub step_loop_limit: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 2000,
            step_loop_limit: 4,
        }
    }
}
