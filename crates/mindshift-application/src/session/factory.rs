use crate::audio_sync::{AudioSyncController, SyncSignal};
use crate::orchestrator::SessionOrchestrator;
use mindshift_core::authority::SessionAuthority;
use mindshift_core::config::OrchestratorConfig;
use mindshift_core::session::SessionState;
use mindshift_core::speech::SpeechSynthesizer;
use mindshift_core::step::{ModalityRouter, ResponseClassifier, StepRegistry};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Factory for creating SessionOrchestrator instances.
///
/// Holds the collaborators shared by every session (the validated step
/// registry, the authority client and the optional synthesizer) and wires a
/// fresh per-session state around them.
pub struct OrchestratorFactory {
    registry: Arc<StepRegistry>,
    authority: Arc<dyn SessionAuthority>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    config: OrchestratorConfig,
}

impl OrchestratorFactory {
    /// Creates a new OrchestratorFactory.
    ///
    /// # Arguments
    ///
    /// * `registry` - Step registry, built (and validated) once at startup
    /// * `authority` - Remote session authority client
    /// * `config` - Per-session orchestrator settings
    pub fn new(
        registry: Arc<StepRegistry>,
        authority: Arc<dyn SessionAuthority>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            authority,
            synthesizer: None,
            config,
        }
    }

    /// Attaches a speech synthesizer. Speech is used only when
    /// `config.speech.enabled` is also set.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Creates an orchestrator for `session_id`.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session identifier known to the authority
    /// * `user_id` - The user driving the session
    /// * `signals` - Sender side of the session queue; timers and speech
    ///   callbacks are posted here
    pub fn create(
        &self,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        signals: UnboundedSender<SyncSignal>,
    ) -> SessionOrchestrator {
        let audio = AudioSyncController::new(
            self.config.speech.clone(),
            self.config.reading_delay.clone(),
            self.synthesizer.clone(),
            signals,
        );
        SessionOrchestrator::new(
            SessionState::new(session_id, user_id),
            ResponseClassifier::new(self.registry.clone()),
            ModalityRouter::new(self.registry.clone(), &self.config.guardrails),
            self.authority.clone(),
            audio,
            &self.config,
        )
    }

    /// Creates an orchestrator for a brand-new session with a generated id.
    pub fn create_new(
        &self,
        user_id: impl Into<String>,
        signals: UnboundedSender<SyncSignal>,
    ) -> SessionOrchestrator {
        self.create(Uuid::new_v4().to_string(), user_id, signals)
    }
}
