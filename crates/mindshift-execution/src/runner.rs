//! Serialized per-session event queue.
//!
//! Each session runs as one tokio task that owns its [`SessionOrchestrator`].
//! Host actions and the synthesizer's playback reports arrive as
//! [`SessionCommand`]s, timer expiries arrive as [`SyncSignal`]s, and the task
//! applies them one at a time. Nothing else touches the orchestrator.
//!
//! Forward commands claim the session's busy permit when they are enqueued,
//! not when they are dequeued, so a double click on the host side fails with
//! `Busy` right away instead of queuing a second request.

use mindshift_application::{SessionOrchestrator, SyncSignal, Transition, UndoOutcome};
use mindshift_core::error::{Result, ShiftError};
use mindshift_core::session::{BusyFlag, BusyPermit, SessionView, Turn};
use mindshift_core::speech::SpeechEvent;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use uuid::Uuid;

type Reply<T> = oneshot::Sender<Result<T>>;

/// A host action queued for a session runner.
#[derive(Debug)]
pub enum SessionCommand {
    Start {
        resume: bool,
        permit: BusyPermit,
        reply: Reply<Transition>,
    },
    Submit {
        text: String,
        permit: BusyPermit,
        reply: Reply<Transition>,
    },
    /// Text produced by the speech recognizer for the current step.
    Transcript {
        text: String,
        permit: BusyPermit,
        reply: Reply<Transition>,
    },
    Select {
        value: String,
        permit: BusyPermit,
        reply: Reply<Transition>,
    },
    Undo {
        permit: BusyPermit,
        reply: Reply<UndoOutcome>,
    },
    /// Playback started or finished for an utterance of this session.
    Speech(SpeechEvent),
    View {
        reply: oneshot::Sender<SessionView>,
    },
    TurnLog {
        reply: oneshot::Sender<Vec<Turn>>,
    },
    Shutdown,
}

/// What changed after the runner applied one event.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    /// Number of turns removed from the end of the log (undo, resume).
    pub rolled_back: usize,
    /// Turns appended to the log, oldest first.
    pub appended: Vec<Turn>,
    pub view: SessionView,
}

/// Cloneable entry point for one running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: String,
    user_id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    busy: BusyFlag,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// False once the runner task has exited.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub async fn start(&self) -> Result<Transition> {
        let permit = self.claim()?;
        self.request(|reply| SessionCommand::Start {
            resume: false,
            permit,
            reply,
        })
        .await
    }

    pub async fn resume(&self) -> Result<Transition> {
        let permit = self.claim()?;
        self.request(|reply| SessionCommand::Start {
            resume: true,
            permit,
            reply,
        })
        .await
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<Transition> {
        let permit = self.claim()?;
        let text = text.into();
        self.request(|reply| SessionCommand::Submit {
            text,
            permit,
            reply,
        })
        .await
    }

    /// Queues a transcript as the answer to the current step.
    pub async fn submit_transcript(&self, text: impl Into<String>) -> Result<Transition> {
        let permit = self.claim()?;
        let text = text.into();
        self.request(|reply| SessionCommand::Transcript {
            text,
            permit,
            reply,
        })
        .await
    }

    pub async fn select(&self, value: impl Into<String>) -> Result<Transition> {
        let permit = self.claim()?;
        let value = value.into();
        self.request(|reply| SessionCommand::Select {
            value,
            permit,
            reply,
        })
        .await
    }

    /// Waits for the in-flight request (if any) to finish, then queues the undo.
    pub async fn undo(&self) -> Result<UndoOutcome> {
        let permit = self.busy.acquire().await;
        self.request(|reply| SessionCommand::Undo { permit, reply })
            .await
    }

    /// Reports a playback event from the speech synthesizer.
    ///
    /// Queued behind the commands already sent, never rejected as busy.
    /// Events for an utterance that is no longer current are ignored by the
    /// session.
    pub fn speech_event(&self, event: SpeechEvent) -> Result<()> {
        self.send(SessionCommand::Speech(event))
    }

    pub async fn view(&self) -> Result<SessionView> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::View { reply })?;
        response.await.map_err(|_| self.stopped())
    }

    pub async fn turn_log(&self) -> Result<Vec<Turn>> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::TurnLog { reply })?;
        response.await.map_err(|_| self.stopped())
    }

    /// Asks the runner to exit after the commands already queued.
    pub fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }

    fn claim(&self) -> Result<BusyPermit> {
        self.busy.try_acquire().ok_or(ShiftError::Busy)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| self.stopped())?
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| self.stopped())
    }

    fn stopped(&self) -> ShiftError {
        ShiftError::internal(format!("session runner for '{}' has stopped", self.session_id))
    }
}

/// Owns one orchestrator and applies its queued events in order.
pub struct SessionRunner {
    orchestrator: SessionOrchestrator,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    signals: mpsc::UnboundedReceiver<SyncSignal>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    published_turns: Vec<Uuid>,
    published_view: Option<SessionView>,
}

impl SessionRunner {
    /// Wires a runner around `orchestrator`.
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - The session to own
    /// * `signals` - Receiver paired with the sender the orchestrator was created with
    ///
    /// # Returns
    ///
    /// The runner (to be spawned with [`Self::run`]), a handle for the host
    /// and the stream of updates published after every applied event.
    pub fn new(
        orchestrator: SessionOrchestrator,
        signals: mpsc::UnboundedReceiver<SyncSignal>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            session_id: orchestrator.session_id().to_string(),
            user_id: orchestrator.state().user_id.clone(),
            commands: command_tx,
            busy: orchestrator.busy_flag(),
        };
        let published_turns = orchestrator.turn_log().iter().map(|t| t.id).collect();
        let runner = Self {
            orchestrator,
            commands: command_rx,
            signals,
            updates: update_tx,
            published_turns,
            published_view: None,
        };
        (runner, handle, update_rx)
    }

    /// Runs until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        let span = tracing::info_span!("session", session_id = %self.orchestrator.session_id());
        async move {
            tracing::debug!("Session runner started");
            loop {
                tokio::select! {
                    command = self.commands.recv() => match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.apply(command).await,
                    },
                    Some(signal) = self.signals.recv() => self.apply_signal(signal).await,
                }
                self.publish();
            }
            tracing::debug!("Session runner stopped");
        }
        .instrument(span)
        .await
    }

    async fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start {
                resume,
                permit,
                reply,
            } => {
                let result = if resume {
                    self.orchestrator.resume_with_permit(permit).await
                } else {
                    self.orchestrator.start_with_permit(permit).await
                };
                let _ = reply.send(result);
            }
            SessionCommand::Submit {
                text,
                permit,
                reply,
            } => {
                let result = self.orchestrator.submit_with_permit(&text, permit).await;
                let _ = reply.send(result);
            }
            SessionCommand::Transcript {
                text,
                permit,
                reply,
            } => {
                tracing::debug!(chars = text.chars().count(), "Applying transcript");
                let result = self.orchestrator.submit_with_permit(&text, permit).await;
                let _ = reply.send(result);
            }
            SessionCommand::Select {
                value,
                permit,
                reply,
            } => {
                let result = self.orchestrator.select_with_permit(&value, permit).await;
                let _ = reply.send(result);
            }
            SessionCommand::Undo { permit, reply } => {
                let result = self.orchestrator.undo_with_permit(permit).await;
                let _ = reply.send(result);
            }
            SessionCommand::Speech(event) => {
                self.apply_signal(SyncSignal::Speech(event)).await;
            }
            SessionCommand::View { reply } => {
                let _ = reply.send(self.orchestrator.view());
            }
            SessionCommand::TurnLog { reply } => {
                let _ = reply.send(self.orchestrator.turn_log().to_vec());
            }
            SessionCommand::Shutdown => {}
        }
    }

    async fn apply_signal(&mut self, signal: SyncSignal) {
        match self.orchestrator.handle_signal(signal).await {
            Ok(Some(transition)) => {
                tracing::debug!(applied = transition.is_applied(), "Auto-advanced");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(?signal, "Failed to apply signal: {}", e),
        }
    }

    /// Publishes the difference since the last update, if there is one.
    fn publish(&mut self) {
        let log = self.orchestrator.turn_log();
        let kept = self
            .published_turns
            .iter()
            .zip(log)
            .take_while(|(id, turn)| **id == turn.id)
            .count();
        let rolled_back = self.published_turns.len() - kept;
        let appended = log[kept..].to_vec();
        let view = self.orchestrator.view();

        if rolled_back == 0 && appended.is_empty() && self.published_view.as_ref() == Some(&view) {
            return;
        }

        self.published_turns.truncate(kept);
        self.published_turns.extend(appended.iter().map(|t| t.id));
        self.published_view = Some(view.clone());
        // Hosts that do not listen drop the receiver.
        let _ = self.updates.send(SessionUpdate {
            rolled_back,
            appended,
            view,
        });
    }
}
