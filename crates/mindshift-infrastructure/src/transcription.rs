//! HTTP client for the speech-recognition (transcription) service.
//!
//! The service accepts a multipart upload with a single `audio` field on
//! `POST /transcribe`, authenticates with an optional `X-API-Key` header and
//! rejects unsupported formats (400), oversized files (413) and bad keys
//! (401). Format and size are checked here before uploading so obvious
//! mistakes never leave the machine.

use async_trait::async_trait;
use mindshift_core::config::TranscriptionConfig;
use mindshift_core::error::{Result, ShiftError};
use mindshift_core::speech::SpeechRecognizer;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const API_KEY_HEADER: &str = "X-API-Key";

/// One timed segment of a transcript.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full response of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transcription {
    pub transcript: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub language: Option<String>,
    /// Audio duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub total_processing_time: Option<f64>,
}

/// Response of `GET /health`, returned for both 200 and 503.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub cache: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Deserialize)]
struct CacheCleared {
    deleted: u64,
}

#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    client: Client,
    config: TranscriptionConfig,
}

impl HttpTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ShiftError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Uploads `audio` and returns the full transcription.
    pub async fn transcribe_detailed(&self, audio: &Path) -> Result<Transcription> {
        let (file_name, extension) = self.check_format(audio)?;
        let size = tokio::fs::metadata(audio).await?.len();
        self.check_size(size)?;

        let bytes = tokio::fs::read(audio).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(&extension))
            .map_err(|e| ShiftError::internal(format!("Invalid audio mime type: {}", e)))?;
        let form = Form::new().part("audio", part);

        let request = self.authorized(self.client.post(self.endpoint("transcribe")));
        let response = request.multipart(form).send().await.map_err(|e| {
            ShiftError::transport(format!("Failed to reach transcription service: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            tracing::warn!(file = %file_name, status = status.as_u16(), "Transcription rejected: {}", detail);
            return Err(ShiftError::transport(format!(
                "Transcription service error ({}): {}",
                status, detail
            )));
        }

        let transcription: Transcription = response.json().await.map_err(|e| {
            ShiftError::transport(format!("Failed to parse transcription: {}", e))
        })?;
        tracing::info!(
            file = %file_name,
            bytes = size,
            chars = transcription.transcript.chars().count(),
            language = transcription.language.as_deref().unwrap_or("unknown"),
            "Transcription complete"
        );
        Ok(transcription)
    }

    /// Queries `GET /health`.
    ///
    /// An unhealthy service answers 503 with a readable body; that is
    /// returned as a status, not an error.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| ShiftError::transport(format!("Failed to reach transcription service: {}", e)))?;
        let status = response.status();
        response.json::<HealthStatus>().await.map_err(|e| {
            ShiftError::transport(format!("Unreadable health response ({}): {}", status, e))
        })
    }

    /// Clears the service's transcription cache, returning the number of entries removed.
    pub async fn clear_cache(&self) -> Result<u64> {
        let response = self
            .authorized(self.client.delete(self.endpoint("cache")))
            .send()
            .await
            .map_err(|e| ShiftError::transport(format!("Failed to reach transcription service: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(ShiftError::transport(format!(
                "Transcription service error ({}): {}",
                status, detail
            )));
        }
        let cleared: CacheCleared = response.json().await.map_err(|e| {
            ShiftError::transport(format!("Failed to parse cache response: {}", e))
        })?;
        Ok(cleared.deleted)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Returns the file name and lowercase extension of an accepted file.
    fn check_format(&self, audio: &Path) -> Result<(String, String)> {
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ShiftError::guardrail("No filename provided"))?
            .to_string();
        let extension = audio
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.config.allows_format(&extension) {
            return Err(ShiftError::guardrail(format!(
                "Unsupported audio format: {}. Allowed formats: {}",
                if extension.is_empty() { "none" } else { extension.as_str() },
                self.config.allowed_formats.join(", ")
            )));
        }
        Ok((file_name, extension))
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.config.max_file_size {
            return Err(ShiftError::guardrail(format!(
                "File too large: {} bytes > {} bytes",
                size, self.config.max_file_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechRecognizer for HttpTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let transcription = self.transcribe_detailed(audio).await?;
        Ok(transcription.transcript.trim().to_string())
    }
}

fn mime_for(extension: &str) -> &'static str {
    match extension {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// The `detail` field of an error body, or the raw text.
async fn error_detail(response: reqwest::Response) -> String {
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text)
}
