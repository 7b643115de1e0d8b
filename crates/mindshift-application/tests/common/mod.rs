#![allow(dead_code)]

use async_trait::async_trait;
use mindshift_application::{OrchestratorFactory, SessionOrchestrator, SyncSignal};
use mindshift_core::Result;
use mindshift_core::ShiftError;
use mindshift_core::authority::{AuthorityReply, AuthorityRequest, SessionAuthority};
use mindshift_core::config::OrchestratorConfig;
use mindshift_core::speech::{SpeechRequest, SpeechSynthesizer};
use mindshift_core::step::StepRegistry;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Ordered log shared by the mocks so tests can assert cross-collaborator ordering.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Authority that answers from a script and records every request.
pub struct ScriptedAuthority {
    replies: Mutex<VecDeque<Result<AuthorityReply>>>,
    requests: Mutex<Vec<AuthorityRequest>>,
    events: EventLog,
}

impl ScriptedAuthority {
    pub fn new(events: EventLog) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn reply(&self, reply: AuthorityReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn fail(&self, error: ShiftError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<AuthorityRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> AuthorityRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SessionAuthority for ScriptedAuthority {
    async fn exchange(&self, request: &AuthorityRequest) -> Result<AuthorityReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.events
            .lock()
            .unwrap()
            .push(format!("exchange:{}", request.action));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ShiftError::transport("no scripted reply")))
    }
}

/// Synthesizer that records speak/stop calls.
pub struct RecordingSynthesizer {
    requests: Mutex<Vec<SpeechRequest>>,
    events: EventLog,
}

impl RecordingSynthesizer {
    pub fn new(events: EventLog) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn last_utterance(&self) -> uuid::Uuid {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.utterance_id)
            .unwrap()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(&self, request: SpeechRequest) -> Result<()> {
        self.events.lock().unwrap().push("speak".to_string());
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.events.lock().unwrap().push("stop".to_string());
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: SessionOrchestrator,
    pub authority: Arc<ScriptedAuthority>,
    pub synthesizer: Arc<RecordingSynthesizer>,
    pub signals: UnboundedReceiver<SyncSignal>,
    pub events: EventLog,
}

impl Harness {
    pub fn new(speech_enabled: bool) -> Self {
        let mut config = OrchestratorConfig::default();
        config.speech.enabled = speech_enabled;
        Self::with_config(config)
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let authority = Arc::new(ScriptedAuthority::new(events.clone()));
        let synthesizer = Arc::new(RecordingSynthesizer::new(events.clone()));
        let registry = Arc::new(StepRegistry::standard().unwrap());
        let factory = OrchestratorFactory::new(registry, authority.clone(), config)
            .with_synthesizer(synthesizer.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            orchestrator: factory.create("session-1", "user-1", tx),
            authority,
            synthesizer,
            signals: rx,
            events,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}
