//! Audio/text sync controller.
//!
//! With speech output enabled, a system turn stays hidden until the
//! synthesizer reports that speech has started (or the start timeout
//! expires). Auto-advance steps advance on the speech-finished signal when
//! speech is enabled, or on a reading-delay timer when it is not; never both.
//!
//! Timers do not call back into the orchestrator directly. They post a
//! [`SyncSignal`] to the session queue, so every callback is applied in the
//! same serialized order as user actions.

use mindshift_core::config::{ReadingDelayConfig, SpeechConfig};
use mindshift_core::session::{AudioTiming, Turn};
use mindshift_core::speech::{SpeechEvent, SpeechRequest, SpeechSynthesizer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A callback routed through the session queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    /// Started/finished reported by the synthesizer.
    Speech(SpeechEvent),
    /// The speech-started signal did not arrive in time.
    SpeechStartTimeout { utterance_id: Uuid },
    /// The reading delay of an auto step expired.
    ReadingDelayElapsed { ticket: u64 },
}

/// How a system turn was handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Append the turn now.
    Immediate(Turn),
    /// The turn is held until speech starts.
    Deferred { utterance_id: Uuid },
}

/// Result of a speech-finished signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishedOutcome {
    /// A still-hidden turn to reveal (finished arrived before started).
    pub reveal: Option<Turn>,
    /// Issue the auto-advance continue request.
    pub advance: bool,
}

#[derive(Debug)]
struct Utterance {
    id: Uuid,
    requested_at: Instant,
    pending: Option<Turn>,
    auto_advance: bool,
    start_timeout: CancellationToken,
}

#[derive(Debug)]
struct ArmedTimer {
    ticket: u64,
    cancel: CancellationToken,
}

pub struct AudioSyncController {
    speech: SpeechConfig,
    reading_delay: ReadingDelayConfig,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    signals: UnboundedSender<SyncSignal>,
    utterance: Option<Utterance>,
    timer: Option<ArmedTimer>,
    next_ticket: u64,
}

impl AudioSyncController {
    pub fn new(
        speech: SpeechConfig,
        reading_delay: ReadingDelayConfig,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        signals: UnboundedSender<SyncSignal>,
    ) -> Self {
        Self {
            speech,
            reading_delay,
            synthesizer,
            signals,
            utterance: None,
            timer: None,
            next_ticket: 0,
        }
    }

    /// Speech output needs both the setting and a synthesizer.
    pub fn speech_enabled(&self) -> bool {
        self.speech.enabled && self.synthesizer.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.utterance.is_some()
    }

    pub fn has_pending_reveal(&self) -> bool {
        self.utterance.as_ref().is_some_and(|u| u.pending.is_some())
    }

    pub fn auto_advance_armed(&self) -> bool {
        self.timer.is_some() || self.utterance.as_ref().is_some_and(|u| u.auto_advance)
    }

    /// Stops in-flight speech and disarms every pending trigger.
    ///
    /// Returns the turn that was still waiting for speech to start, if any;
    /// the caller decides whether to reveal or discard it.
    pub async fn interrupt(&mut self) -> Option<Turn> {
        if let Some(timer) = self.timer.take() {
            timer.cancel.cancel();
        }
        let utterance = self.utterance.take()?;
        utterance.start_timeout.cancel();

        if let Some(synthesizer) = &self.synthesizer {
            tracing::debug!(utterance_id = %utterance.id, "Stopping in-flight speech");
            if let Err(e) = synthesizer.stop().await {
                tracing::warn!(utterance_id = %utterance.id, "Failed to stop speech: {}", e);
            }
        }
        utterance.pending
    }

    /// Hands a new system turn to the controller.
    ///
    /// Call [`Self::interrupt`] first; a previous utterance is never overlapped.
    pub async fn present(&mut self, turn: Turn, auto_advance: bool) -> Presentation {
        if self.speech_enabled() && !turn.text.trim().is_empty() {
            if let Some(synthesizer) = self.synthesizer.clone() {
                let request =
                    SpeechRequest::new(turn.text.clone(), &self.speech.voice, self.speech.speed);
                let utterance_id = request.utterance_id;
                let requested_at = Instant::now();

                match synthesizer.speak(request).await {
                    Ok(()) => {
                        let start_timeout = self.schedule(
                            self.speech.start_timeout(),
                            SyncSignal::SpeechStartTimeout { utterance_id },
                        );
                        self.utterance = Some(Utterance {
                            id: utterance_id,
                            requested_at,
                            pending: Some(turn),
                            auto_advance,
                            start_timeout,
                        });
                        return Presentation::Deferred { utterance_id };
                    }
                    Err(e) => {
                        tracing::warn!(
                            step_id = turn.step_id.as_deref().unwrap_or_default(),
                            "Speech request failed, showing text immediately: {}",
                            e
                        );
                    }
                }
            }
        }

        if auto_advance {
            self.arm_reading_delay(&turn.text);
        }
        Presentation::Immediate(turn)
    }

    /// Reveals the deferred turn for `utterance_id`, stamped with audio timing.
    pub fn on_speech_started(&mut self, utterance_id: Uuid) -> Option<Turn> {
        let utterance = self.current(utterance_id)?;
        utterance.start_timeout.cancel();
        let elapsed = elapsed_ms(utterance.requested_at);
        let mut turn = utterance.pending.take()?;
        turn.audio = Some(AudioTiming {
            speech_start_ms: Some(elapsed),
            text_reveal_ms: Some(elapsed),
        });
        Some(turn)
    }

    /// Reveals the deferred turn without a speech-start offset.
    pub fn on_speech_start_timeout(&mut self, utterance_id: Uuid) -> Option<Turn> {
        let utterance = self.current(utterance_id)?;
        let elapsed = elapsed_ms(utterance.requested_at);
        let mut turn = utterance.pending.take()?;
        tracing::debug!(%utterance_id, elapsed_ms = elapsed, "Speech start timed out, revealing text");
        turn.audio = Some(AudioTiming {
            speech_start_ms: None,
            text_reveal_ms: Some(elapsed),
        });
        Some(turn)
    }

    /// Ends the utterance. Only the first finished signal per utterance counts.
    pub fn on_speech_finished(&mut self, utterance_id: Uuid) -> FinishedOutcome {
        if self.current(utterance_id).is_none() {
            tracing::debug!(%utterance_id, "Ignoring stale speech-finished signal");
            return FinishedOutcome::default();
        }
        let Some(utterance) = self.utterance.take() else {
            return FinishedOutcome::default();
        };
        utterance.start_timeout.cancel();

        let elapsed = elapsed_ms(utterance.requested_at);
        let reveal = utterance.pending.map(|mut turn| {
            turn.audio = Some(AudioTiming {
                speech_start_ms: None,
                text_reveal_ms: Some(elapsed),
            });
            turn
        });
        FinishedOutcome {
            reveal,
            advance: utterance.auto_advance,
        }
    }

    /// True exactly once for the currently armed reading-delay ticket.
    pub fn on_reading_delay_elapsed(&mut self, ticket: u64) -> bool {
        match &self.timer {
            Some(timer) if timer.ticket == ticket => {
                self.timer = None;
                true
            }
            _ => {
                tracing::debug!(ticket, "Ignoring stale reading-delay signal");
                false
            }
        }
    }

    fn current(&mut self, utterance_id: Uuid) -> Option<&mut Utterance> {
        self.utterance.as_mut().filter(|u| u.id == utterance_id)
    }

    fn arm_reading_delay(&mut self, text: &str) {
        if let Some(previous) = self.timer.take() {
            previous.cancel.cancel();
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let delay = self.reading_delay.delay_for(text);
        tracing::debug!(ticket, delay_ms = delay.as_millis() as u64, "Arming auto-advance timer");
        let cancel = self.schedule(delay, SyncSignal::ReadingDelayElapsed { ticket });
        self.timer = Some(ArmedTimer { ticket, cancel });
    }

    fn schedule(&self, after: Duration, signal: SyncSignal) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    // The queue is gone once the session shuts down.
                    let _ = signals.send(signal);
                }
            }
        });
        token
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
