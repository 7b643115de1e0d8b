//! Speech collaborators: synthesis (text to speech) and recognition (speech to text).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// One utterance to speak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub utterance_id: Uuid,
    pub text: String,
    pub voice: String,
    pub speed: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, speed: f32) -> Self {
        Self {
            utterance_id: Uuid::new_v4(),
            text: text.into(),
            voice: voice.into(),
            speed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechEventKind {
    Started,
    Finished,
}

/// Playback signal reported by the synthesizer for one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechEvent {
    pub utterance_id: Uuid,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn started(utterance_id: Uuid) -> Self {
        Self {
            utterance_id,
            kind: SpeechEventKind::Started,
        }
    }

    pub fn finished(utterance_id: Uuid) -> Self {
        Self {
            utterance_id,
            kind: SpeechEventKind::Finished,
        }
    }
}

/// Text-to-speech output.
///
/// `speak` returns once playback has been requested. The host reports
/// started/finished playback separately as [`SpeechEvent`]s tagged with the
/// request's `utterance_id`; they are applied through the session queue like
/// any other action.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, request: SpeechRequest) -> Result<()>;

    /// Stops any in-flight utterance. Must be a no-op when nothing is playing.
    async fn stop(&self) -> Result<()>;
}

/// Speech-to-text input.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribes an audio file, returning the recognized text.
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}
