//! Session service: one running session per id.
//!
//! Composes orchestrators through the [`OrchestratorFactory`], spawns a
//! [`SessionRunner`] for each and keeps the handles in a [`SessionCache`].
//! Starts and submissions are charged against the injected rate-limit store,
//! keyed by the session's user id.

use crate::runner::{SessionHandle, SessionRunner, SessionUpdate};
use mindshift_application::{OrchestratorFactory, RateLimitStore, SessionCache, Transition, UndoOutcome};
use mindshift_core::error::{Result, ShiftError};
use mindshift_core::speech::SpeechEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A session that was just started or resumed.
#[derive(Debug)]
pub struct OpenedSession {
    pub handle: SessionHandle,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
    /// Outcome of the initial start/resume exchange.
    pub transition: Transition,
}

pub struct SessionService {
    factory: OrchestratorFactory,
    sessions: SessionCache<SessionHandle>,
    rate_limit: Arc<dyn RateLimitStore>,
}

impl SessionService {
    /// Creates a new SessionService.
    ///
    /// # Arguments
    ///
    /// * `factory` - Builds the orchestrator for each session
    /// * `rate_limit` - Request budget shared by every session of this service
    pub fn new(factory: OrchestratorFactory, rate_limit: Arc<dyn RateLimitStore>) -> Self {
        Self {
            factory,
            sessions: SessionCache::new(),
            rate_limit,
        }
    }

    pub fn factory(&self) -> &OrchestratorFactory {
        &self.factory
    }

    /// Starts a brand-new session for `user_id`.
    pub async fn start(&self, user_id: &str) -> Result<OpenedSession> {
        self.rate_limit.check(user_id).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.factory.create_new(user_id, tx);
        let (runner, handle, updates) = SessionRunner::new(orchestrator, rx);
        tokio::spawn(runner.run());

        let transition = handle.start().await?;
        tracing::info!(
            session_id = handle.session_id(),
            user_id,
            applied = transition.is_applied(),
            "Session started"
        );
        self.sessions
            .insert(handle.session_id().to_string(), handle.clone())
            .await;
        Ok(OpenedSession {
            handle,
            updates,
            transition,
        })
    }

    /// Reattaches to `session_id` at the authority.
    ///
    /// # Errors
    ///
    /// `ShiftError::AlreadyStarted` if the session is already running here.
    pub async fn resume(&self, session_id: &str, user_id: &str) -> Result<OpenedSession> {
        if self.sessions.get(session_id).await.is_some() {
            return Err(ShiftError::AlreadyStarted(session_id.to_string()));
        }
        self.rate_limit.check(user_id).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.factory.create(session_id, user_id, tx);
        let (runner, handle, updates) = SessionRunner::new(orchestrator, rx);
        tokio::spawn(runner.run());

        let transition = handle.resume().await?;
        tracing::info!(session_id, user_id, applied = transition.is_applied(), "Session resumed");
        self.sessions
            .insert(session_id.to_string(), handle.clone())
            .await;
        Ok(OpenedSession {
            handle,
            updates,
            transition,
        })
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).await
    }

    pub async fn submit(&self, session_id: &str, text: &str) -> Result<Transition> {
        let handle = self.charged(session_id).await?;
        handle.submit(text).await
    }

    pub async fn submit_transcript(&self, session_id: &str, text: &str) -> Result<Transition> {
        let handle = self.charged(session_id).await?;
        handle.submit_transcript(text).await
    }

    pub async fn select(&self, session_id: &str, value: &str) -> Result<Transition> {
        let handle = self.charged(session_id).await?;
        handle.select(value).await
    }

    /// Undo is not rate limited; it never asks the authority for new content.
    pub async fn undo(&self, session_id: &str) -> Result<UndoOutcome> {
        self.handle(session_id).await?.undo().await
    }

    /// Routes a synthesizer playback event into the session's queue.
    /// Not rate limited.
    pub async fn speech_event(&self, session_id: &str, event: SpeechEvent) -> Result<()> {
        self.handle(session_id).await?.speech_event(event)
    }

    /// Stops the session's runner and forgets it.
    pub async fn close(&self, session_id: &str) -> bool {
        match self.sessions.remove(session_id).await {
            Some(handle) => {
                handle.shutdown();
                tracing::info!(session_id, "Session closed");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.len().await
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(|| ShiftError::not_found("session", session_id))
    }

    async fn charged(&self, session_id: &str) -> Result<SessionHandle> {
        let handle = self.handle(session_id).await?;
        self.rate_limit.check(handle.user_id()).await?;
        Ok(handle)
    }
}
