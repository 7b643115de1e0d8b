//! Session orchestrator.
//!
//! A thin, synchronized mirror of one session at the remote authority. Every
//! forward transition follows the same sequence:
//!
//! 1. stop in-flight speech (revealing any text still held back)
//! 2. push a history snapshot of the step being left
//! 3. apply local selections and append the user turn
//! 4. exchange with the authority while holding the busy permit
//! 5. apply the reply: step, system turn, classified affordance, speech
//!
//! The orchestrator knows nothing about its host. A CLI, a GUI or the
//! execution runner drive it through `start`, `submit`, `select_affordance`,
//! `undo` and the read-only observers.

use crate::audio_sync::{AudioSyncController, Presentation, SyncSignal};
use mindshift_core::authority::{AuthorityOutcome, AuthorityRequest, SessionAuthority};
use mindshift_core::config::OrchestratorConfig;
use mindshift_core::error::{Result, ShiftError};
use mindshift_core::session::{
    BusyFlag, BusyPermit, HistoryEntry, HistoryStack, SessionState, SessionView, Turn,
};
use mindshift_core::speech::SpeechEventKind;
use mindshift_core::step::{
    AffordanceSource, GuardrailWarning, Modality, ModalityRouter, Resolution, ResponseAffordance,
    ResponseClassifier, ResponseType, WorkType, check_input, check_step_loop,
    looks_like_clarification, normalize_choice,
};
use std::iter;
use std::sync::Arc;
use tokio::time::Instant;

const LOG_TARGET: &str = "mindshift::session";

/// Result of a forward request that reached the authority (or failed to).
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The authority accepted the request and moved to `step_id`.
    Applied {
        step_id: String,
        affordance: ResponseAffordance,
        warnings: Vec<GuardrailWarning>,
        complete: bool,
    },
    /// The exchange failed. An inline error turn was appended and the
    /// session stays on its current step.
    Failed { error: ShiftError },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Result of an undo request.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// The authority rolled back and local state was restored.
    Restored { step_id: String },
    /// The history stack was empty. Nothing was sent.
    NothingToUndo,
    /// The authority refused. Local state is untouched and the history entry is dropped.
    Rejected { error: ShiftError },
}

/// A local selection applied together with a forward request.
#[derive(Debug, Clone, Copy)]
enum Selection {
    WorkType(WorkType),
    Method(Modality),
}

/// A validated forward request, ready to send.
#[derive(Debug)]
struct Forward {
    user_input: Option<String>,
    user_turn: Option<String>,
    selection: Option<Selection>,
}

impl Forward {
    fn bare() -> Self {
        Self {
            user_input: None,
            user_turn: None,
            selection: None,
        }
    }

    fn answer(wire: impl Into<String>, shown: impl Into<String>) -> Self {
        Self {
            user_input: Some(wire.into()),
            user_turn: Some(shown.into()),
            selection: None,
        }
    }

    fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

pub struct SessionOrchestrator {
    state: SessionState,
    affordance: ResponseAffordance,
    history: HistoryStack,
    classifier: ResponseClassifier,
    router: ModalityRouter,
    authority: Arc<dyn SessionAuthority>,
    audio: AudioSyncController,
    busy: BusyFlag,
    last_error: Option<String>,
}

impl SessionOrchestrator {
    pub fn new(
        state: SessionState,
        classifier: ResponseClassifier,
        router: ModalityRouter,
        authority: Arc<dyn SessionAuthority>,
        audio: AudioSyncController,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            state,
            affordance: ResponseAffordance::default(),
            history: HistoryStack::new(config.history_capacity),
            classifier,
            router,
            authority,
            audio,
            busy: BusyFlag::new(),
            last_error: None,
        }
    }

    // ============================================================================
    // Observers
    // ============================================================================

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn current_step(&self) -> Option<&str> {
        self.state.current_step()
    }

    pub fn turn_log(&self) -> &[Turn] {
        &self.state.turn_log
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The last classified affordance.
    pub fn affordance(&self) -> &ResponseAffordance {
        &self.affordance
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// A clone of the session's busy flag, for hosts that claim permits at enqueue time.
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Methods the user may pick given the selected work type.
    pub fn offered_methods(&self) -> &'static [Modality] {
        Modality::offered_for(self.state.selected_work_type.unwrap_or(WorkType::Problem))
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.state.session_id.clone(),
            user_id: self.state.user_id.clone(),
            current_step_id: self.state.current_step_id.clone(),
            selected_work_type: self.state.selected_work_type,
            selected_method: self.state.selected_method,
            affordance: self.affordance.clone(),
            turn_count: self.state.turn_log.len(),
            history_depth: self.history.len(),
            is_busy: self.busy.is_busy(),
            is_complete: self.state.is_complete,
            last_error: self.last_error.clone(),
        }
    }

    // ============================================================================
    // Host surface
    // ============================================================================

    /// Starts a fresh session.
    pub async fn start(&mut self) -> Result<Transition> {
        let permit = self.claim()?;
        self.start_with_permit(permit).await
    }

    pub async fn start_with_permit(&mut self, permit: BusyPermit) -> Result<Transition> {
        self.check_permit(&permit)?;
        if self.state.is_started() {
            return Err(ShiftError::AlreadyStarted(self.state.session_id.clone()));
        }
        let request = AuthorityRequest::start(&self.state.session_id, &self.state.user_id);
        let transition = match self.exchange(&request).await {
            Ok((outcome, latency_ms)) => self.apply_outcome(outcome, latency_ms).await,
            Err(error) => self.report_failure(error),
        };
        drop(permit);
        Ok(transition)
    }

    /// Reattaches to a session the authority already knows.
    pub async fn resume(&mut self) -> Result<Transition> {
        let permit = self.claim()?;
        self.resume_with_permit(permit).await
    }

    pub async fn resume_with_permit(&mut self, permit: BusyPermit) -> Result<Transition> {
        self.check_permit(&permit)?;
        if self.state.is_started() {
            return Err(ShiftError::AlreadyStarted(self.state.session_id.clone()));
        }
        let request = AuthorityRequest::resume(&self.state.session_id, &self.state.user_id);
        let transition = match self.exchange(&request).await {
            Ok((mut outcome, latency_ms)) => {
                let replayed = std::mem::take(&mut outcome.messages);
                if !replayed.is_empty() {
                    let mut log: Vec<Turn> = replayed.into_iter().map(Turn::from).collect();
                    // The current step's message is re-presented below.
                    if log
                        .last()
                        .is_some_and(|t| t.is_system() && t.text == outcome.message)
                    {
                        log.pop();
                    }
                    self.state.turn_log = log;
                }
                self.infer_selections(&outcome.current_step_id);
                self.apply_outcome(outcome, latency_ms).await
            }
            Err(error) => self.report_failure(error),
        };
        drop(permit);
        Ok(transition)
    }

    /// Submits free text (typed or transcribed) for the current step.
    ///
    /// When the current affordance is structured the text is interpreted as
    /// a selection, so a spoken "yes" answers a yes/no step.
    pub async fn submit(&mut self, text: &str) -> Result<Transition> {
        let permit = self.claim()?;
        self.submit_with_permit(text, permit).await
    }

    pub async fn submit_with_permit(&mut self, text: &str, permit: BusyPermit) -> Result<Transition> {
        self.check_permit(&permit)?;
        self.ensure_active()?;
        let forward = match self.affordance.response_type {
            ResponseType::Auto => Forward::bare(),
            ResponseType::FreeText => self.free_text(text)?,
            _ => self.selection(text)?,
        };
        Ok(self.forward(forward, permit).await)
    }

    /// Answers the current structured affordance.
    ///
    /// Work types accept "1"/"2"/"3" or their names, methods accept their
    /// display name, identifier or 1-based position in the offered list, and
    /// yes/no answers are normalized.
    pub async fn select_affordance(&mut self, value: &str) -> Result<Transition> {
        let permit = self.claim()?;
        self.select_with_permit(value, permit).await
    }

    pub async fn select_with_permit(&mut self, value: &str, permit: BusyPermit) -> Result<Transition> {
        self.check_permit(&permit)?;
        self.ensure_active()?;
        let forward = self.selection(value)?;
        Ok(self.forward(forward, permit).await)
    }

    /// Rolls back to the step before the most recent forward transition.
    ///
    /// Waits for any in-flight request to finish first.
    pub async fn undo(&mut self) -> Result<UndoOutcome> {
        let permit = self.busy.acquire().await;
        self.undo_with_permit(permit).await
    }

    pub async fn undo_with_permit(&mut self, permit: BusyPermit) -> Result<UndoOutcome> {
        self.check_permit(&permit)?;
        if self.state.is_complete {
            return Err(ShiftError::SessionComplete(self.state.session_id.clone()));
        }
        let Some(entry) = self.history.pop() else {
            tracing::debug!(target: LOG_TARGET, session_id = %self.state.session_id, "Nothing to undo");
            return Ok(UndoOutcome::NothingToUndo);
        };

        let request = AuthorityRequest::undo(
            &self.state.session_id,
            &self.state.user_id,
            entry.from_step_id.clone(),
        );
        let started = Instant::now();
        let acknowledged = self
            .authority
            .exchange(&request)
            .await
            .and_then(|reply| {
                if reply.success {
                    Ok(reply)
                } else {
                    Err(ShiftError::UndoRejected(
                        reply.error.unwrap_or_else(|| "rollback refused".to_string()),
                    ))
                }
            });
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = match acknowledged {
            Ok(reply) => {
                if let Some(step) = reply.current_step_id.as_deref() {
                    if step != entry.from_step_id {
                        tracing::warn!(
                            target: LOG_TARGET,
                            session_id = %self.state.session_id,
                            expected = %entry.from_step_id,
                            reported = step,
                            "Authority rolled back to a different step than requested"
                        );
                    }
                }
                // Text of the undone turn is discarded, not revealed.
                let _ = self.audio.interrupt().await;
                self.state = entry.snapshot;
                self.affordance = entry.affordance;
                self.last_error = None;
                tracing::info!(
                    target: LOG_TARGET,
                    session_id = %self.state.session_id,
                    step_id = %entry.from_step_id,
                    action = "undo",
                    latency_ms,
                    history_depth = self.history.len(),
                    "Rolled back"
                );
                UndoOutcome::Restored {
                    step_id: entry.from_step_id,
                }
            }
            Err(error) => {
                let error = match error {
                    ShiftError::UndoRejected(_) => error,
                    other => ShiftError::UndoRejected(other.to_string()),
                };
                tracing::warn!(
                    target: LOG_TARGET,
                    session_id = %self.state.session_id,
                    step_id = %entry.from_step_id,
                    action = "undo",
                    "Undo rejected, history entry discarded: {}",
                    error
                );
                self.last_error = Some(error.to_string());
                UndoOutcome::Rejected { error }
            }
        };
        drop(permit);
        Ok(outcome)
    }

    /// Applies a queued speech or timer callback.
    ///
    /// Returns the transition when the signal triggered an auto-advance.
    pub async fn handle_signal(&mut self, signal: SyncSignal) -> Result<Option<Transition>> {
        let advance = match signal {
            SyncSignal::Speech(event) => match event.kind {
                SpeechEventKind::Started => {
                    if let Some(turn) = self.audio.on_speech_started(event.utterance_id) {
                        self.state.turn_log.push(turn);
                    }
                    false
                }
                SpeechEventKind::Finished => {
                    let finished = self.audio.on_speech_finished(event.utterance_id);
                    if let Some(turn) = finished.reveal {
                        self.state.turn_log.push(turn);
                    }
                    finished.advance
                }
            },
            SyncSignal::SpeechStartTimeout { utterance_id } => {
                if let Some(turn) = self.audio.on_speech_start_timeout(utterance_id) {
                    self.state.turn_log.push(turn);
                }
                false
            }
            SyncSignal::ReadingDelayElapsed { ticket } => self.audio.on_reading_delay_elapsed(ticket),
        };

        if !advance || self.state.is_complete || !self.affordance.is_auto() {
            return Ok(None);
        }
        let Some(permit) = self.busy.try_acquire() else {
            // The queued request will move the step anyway.
            tracing::debug!(target: LOG_TARGET, session_id = %self.state.session_id, "Auto-advance skipped, request in flight");
            return Ok(None);
        };
        Ok(Some(self.forward(Forward::bare(), permit).await))
    }

    // ============================================================================
    // Forward transitions
    // ============================================================================

    fn free_text(&self, text: &str) -> Result<Forward> {
        let step_id = self.state.current_step().unwrap_or_default();
        let guardrails = self
            .router
            .guardrails_for(step_id, self.state.selected_method);
        check_input(&guardrails, text)?;
        let text = text.trim();
        Ok(Forward::answer(text, text))
    }

    fn selection(&self, value: &str) -> Result<Forward> {
        match self.affordance.response_type {
            ResponseType::WorkTypeSelect => {
                let work_type = WorkType::from_selection(value).ok_or_else(|| {
                    ShiftError::guardrail(format!("'{}' is not a work type", value.trim()))
                })?;
                Ok(Forward::answer(work_type.selection_code(), work_type.label())
                    .with_selection(Selection::WorkType(work_type)))
            }
            ResponseType::MethodSelect => {
                let method = self.parse_method(value)?;
                Ok(Forward::answer(method.to_string(), method.to_string())
                    .with_selection(Selection::Method(method)))
            }
            ResponseType::YesNo | ResponseType::YesNoMaybe => {
                let answer = normalize_choice(self.affordance.response_type, value)?;
                Ok(Forward::answer(answer, value.trim()))
            }
            ResponseType::FreeText => self.free_text(value),
            ResponseType::Auto => Ok(Forward::bare()),
        }
    }

    fn parse_method(&self, value: &str) -> Result<Modality> {
        let offered = self.offered_methods();
        let trimmed = value.trim();
        let method = match trimmed.parse::<usize>() {
            Ok(position) if position >= 1 => offered.get(position - 1).copied(),
            _ => trimmed.replace('-', " ").parse::<Modality>().ok(),
        }
        .ok_or_else(|| ShiftError::guardrail(format!("'{}' is not a method", trimmed)))?;

        if self.state.selected_work_type.is_some() && !offered.contains(&method) {
            return Err(ShiftError::guardrail(format!(
                "{} is not offered for {}",
                method,
                self.state
                    .selected_work_type
                    .map(|w| w.label())
                    .unwrap_or_default()
            )));
        }
        Ok(method)
    }

    async fn forward(&mut self, forward: Forward, permit: BusyPermit) -> Transition {
        if let Some(held_back) = self.audio.interrupt().await {
            self.state.turn_log.push(held_back);
        }

        // Auto steps are never rollback targets.
        // `Some(evicted)` when a snapshot was pushed for this request.
        let pushed: Option<Option<HistoryEntry>> = if self.affordance.is_auto() {
            None
        } else if let Some(entry) = HistoryEntry::capture(&self.state, &self.affordance) {
            let evicted = self.history.push(entry);
            if let Some(evicted) = &evicted {
                tracing::debug!(
                    target: LOG_TARGET,
                    session_id = %self.state.session_id,
                    evicted_step = %evicted.from_step_id,
                    "History full, evicted oldest snapshot"
                );
            }
            Some(evicted)
        } else {
            None
        };

        let previous_selections = (self.state.selected_work_type, self.state.selected_method);
        match forward.selection {
            Some(Selection::WorkType(work_type)) => {
                self.state.selected_work_type = Some(work_type);
                self.state.selected_method = None;
            }
            Some(Selection::Method(method)) => self.state.selected_method = Some(method),
            None => {}
        }
        if let Some(text) = forward.user_turn {
            let turn = Turn::user(text, self.state.current_step());
            self.state.turn_log.push(turn);
        }

        let request = AuthorityRequest::continue_with(
            &self.state.session_id,
            &self.state.user_id,
            forward.user_input,
        );
        let transition = match self.exchange(&request).await {
            Ok((outcome, latency_ms)) => self.apply_outcome(outcome, latency_ms).await,
            Err(error) => {
                if let Some(evicted) = pushed {
                    self.history.pop();
                    if let Some(evicted) = evicted {
                        self.history.restore_oldest(evicted);
                    }
                }
                (self.state.selected_work_type, self.state.selected_method) = previous_selections;
                self.report_failure(error)
            }
        };
        drop(permit);
        transition
    }

    async fn exchange(&self, request: &AuthorityRequest) -> Result<(AuthorityOutcome, u64)> {
        let started = Instant::now();
        let outcome = self
            .authority
            .exchange(request)
            .await
            .and_then(|reply| reply.into_outcome());
        let latency_ms = started.elapsed().as_millis() as u64;
        outcome.map(|o| (o, latency_ms))
    }

    async fn apply_outcome(&mut self, outcome: AuthorityOutcome, latency_ms: u64) -> Transition {
        let step_id = outcome.current_step_id;
        self.state.current_step_id = Some(step_id.clone());
        self.state.is_complete = outcome.session_complete;
        self.last_error = None;

        let mut turn = Turn::system(outcome.message, Some(step_id.as_str())).with_latency(latency_ms);
        turn.used_clarification =
            outcome.used_clarification || looks_like_clarification(&turn.text);

        let affordance = self.classify(&step_id, &turn);
        if let Some(hint) = outcome.expected_response_type {
            if hint != affordance.response_type && affordance.source != AffordanceSource::Clarification
            {
                tracing::warn!(
                    target: LOG_TARGET,
                    session_id = %self.state.session_id,
                    step_id = %step_id,
                    hint = %hint,
                    classified = %affordance.response_type,
                    "Authority response-type hint disagrees with classification"
                );
            }
        }

        let guardrails = self
            .router
            .guardrails_for(&step_id, self.state.selected_method);
        let warnings: Vec<GuardrailWarning> = check_step_loop(
            &guardrails,
            self.state
                .system_step_ids()
                .chain(iter::once(step_id.as_str()))
                .collect::<Vec<_>>(),
        )
        .into_iter()
        .collect();
        for warning in &warnings {
            tracing::warn!(target: LOG_TARGET, session_id = %self.state.session_id, ?warning, "Guardrail warning");
        }

        tracing::info!(
            target: LOG_TARGET,
            session_id = %self.state.session_id,
            step_id = %step_id,
            response_type = %affordance.response_type,
            source = ?affordance.source,
            latency_ms,
            complete = outcome.session_complete,
            "Step applied"
        );

        self.state.awaiting_response_type = Some(affordance.response_type);
        self.affordance = affordance.clone();

        let auto_advance = affordance.is_auto() && !self.state.is_complete;
        if let Presentation::Immediate(turn) = self.audio.present(turn, auto_advance).await {
            self.state.turn_log.push(turn);
        }

        Transition::Applied {
            step_id,
            affordance,
            warnings,
            complete: self.state.is_complete,
        }
    }

    fn classify(&self, step_id: &str, turn: &Turn) -> ResponseAffordance {
        let method = self.state.selected_method;
        match self.router.resolve_owner(step_id, method) {
            Resolution::Inactive { owner, .. } if !turn.used_clarification => {
                tracing::warn!(
                    target: LOG_TARGET,
                    session_id = %self.state.session_id,
                    step_id,
                    owner = owner.id(),
                    session_method = method.map(|m| m.id()).unwrap_or("none"),
                    "Step belongs to an inactive modality, falling back to free text"
                );
                ResponseAffordance::free_text(AffordanceSource::Fallback)
            }
            _ => self.classifier.classify(step_id, method, Some(turn)),
        }
    }

    fn report_failure(&mut self, error: ShiftError) -> Transition {
        tracing::warn!(
            target: LOG_TARGET,
            session_id = %self.state.session_id,
            step_id = self.state.current_step().unwrap_or("none"),
            "Request failed: {}",
            error
        );
        let message = match &error {
            ShiftError::Transport(_) => {
                "The session service could not be reached. Please try again.".to_string()
            }
            ShiftError::Authority(reason) => format!("Something went wrong: {}", reason),
            other => other.to_string(),
        };
        self.state.turn_log.push(Turn::error(message));
        self.last_error = Some(error.to_string());
        Transition::Failed { error }
    }

    /// Restores method and work type from the resumed step's owner.
    fn infer_selections(&mut self, step_id: &str) {
        let Some(method) = self
            .classifier
            .registry()
            .get(step_id)
            .and_then(|step| step.modality())
        else {
            return;
        };
        self.state.selected_method = Some(method);
        self.state.selected_work_type = [WorkType::Problem, WorkType::Goal, WorkType::NegativeExperience]
            .into_iter()
            .find(|w| Modality::offered_for(*w).contains(&method));
    }

    fn claim(&self) -> Result<BusyPermit> {
        self.busy.try_acquire().ok_or(ShiftError::Busy)
    }

    fn check_permit(&self, permit: &BusyPermit) -> Result<()> {
        if permit.belongs_to(&self.busy) {
            Ok(())
        } else {
            Err(ShiftError::internal("busy permit was issued for another session"))
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.state.is_started() {
            return Err(ShiftError::NotStarted(self.state.session_id.clone()));
        }
        if self.state.is_complete {
            return Err(ShiftError::SessionComplete(self.state.session_id.clone()));
        }
        Ok(())
    }
}
