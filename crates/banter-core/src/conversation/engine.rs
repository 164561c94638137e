//! The conversation orchestration engine.

use super::alternation::next_speaker;
use super::countdown::Countdown;
use super::event::{EngineEvent, EngineNotice};
use super::gateway::{TurnGateway, TurnRequest, Utterance};
use super::injection::InjectionSlot;
use super::lifecycle::{EndReason, LifecycleState};
use super::model::{History, Participants, Turn};
use super::playback::{AudioSink, PlaybackQueue};
use super::repository::{ConversationDraft, SavedMessage};
use crate::error::{BanterError, Result};
use crate::persona::{PersonaService, PersonaSummary};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default maximum number of appended turns (generated and user-authored).
pub const DEFAULT_MAX_TURNS: usize = 10;
/// Default conversation time budget in seconds.
pub const DEFAULT_BUDGET_SECS: u64 = 120;

/// Parameters for starting a conversation session.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub participants: Participants,
    pub topic: String,
    pub max_turns: usize,
    pub budget_secs: u64,
}

impl StartRequest {
    /// Creates a request with the default turn and time budgets.
    pub fn new(participants: Participants, topic: impl Into<String>) -> Self {
        Self {
            participants,
            topic: topic.into(),
            max_turns: DEFAULT_MAX_TURNS,
            budget_secs: DEFAULT_BUDGET_SECS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_budget_secs(mut self, budget_secs: u64) -> Self {
        self.budget_secs = budget_secs;
        self
    }
}

/// The top-level state machine driving a two-persona conversation.
///
/// Owns the authoritative turn history, the lifecycle state, the playback
/// queue, the countdown, and the interjection slot. All transitions happen
/// inside [`dispatch`] or one of the explicit user operations, and the
/// caller is expected to drive both from a single task — that serialization
/// is what stands in for the reference implementation's single-threaded
/// event loop.
///
/// Async work (persona fetch, turn generation, playback) runs in spawned
/// tasks that post completion events tagged with the epoch current at spawn
/// time. `stop`, `clear`, and `start` bump the epoch, so a completion that
/// arrives late is recognized as stale and dropped rather than mutating a
/// session it no longer belongs to.
///
/// [`dispatch`]: ConversationEngine::dispatch
pub struct ConversationEngine {
    persona_service: Arc<dyn PersonaService>,
    gateway: Arc<dyn TurnGateway>,
    events: mpsc::UnboundedSender<EngineEvent>,

    state: LifecycleState,
    epoch: u64,
    session_id: String,

    participants: Option<Participants>,
    topic: String,
    summaries: Vec<PersonaSummary>,
    max_turns: usize,
    budget_secs: u64,

    history: History,
    queue: PlaybackQueue,
    countdown: Option<Countdown>,
    injection: InjectionSlot,

    budget_exhausted: bool,
    end_reason: Option<EndReason>,
    failure: Option<BanterError>,
}

impl ConversationEngine {
    /// Creates an engine and the receiver its completion events arrive on.
    ///
    /// The caller owns the event loop: receive an [`EngineEvent`], pass it
    /// to [`dispatch`], render the returned notices.
    ///
    /// [`dispatch`]: ConversationEngine::dispatch
    pub fn new(
        persona_service: Arc<dyn PersonaService>,
        gateway: Arc<dyn TurnGateway>,
        sink: Arc<dyn AudioSink>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let queue = PlaybackQueue::new(sink, events.clone());

        let engine = Self {
            persona_service,
            gateway,
            events,
            state: LifecycleState::Idle,
            epoch: 0,
            session_id: String::new(),
            participants: None,
            topic: String::new(),
            summaries: Vec::new(),
            max_turns: DEFAULT_MAX_TURNS,
            budget_secs: DEFAULT_BUDGET_SECS,
            history: History::new(),
            queue,
            countdown: None,
            injection: InjectionSlot::new(),
            budget_exhausted: false,
            end_reason: None,
            failure: None,
        };
        (engine, receiver)
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Starts a new session.
    ///
    /// Valid from `Idle` or any terminal state (the previous session is
    /// wiped, as `clear` would). Validation failures leave the engine
    /// untouched.
    ///
    /// # Errors
    ///
    /// - `InProgress` while a session is running
    /// - `InvalidConfig` for an empty topic or zero budgets
    pub fn start(&mut self, request: StartRequest) -> Result<Vec<EngineNotice>> {
        if self.state.is_running() {
            return Err(BanterError::InProgress);
        }
        if request.topic.trim().is_empty() {
            return Err(BanterError::invalid_config("topic must be non-empty"));
        }
        if request.max_turns == 0 {
            return Err(BanterError::invalid_config("max_turns must be at least 1"));
        }
        if request.budget_secs == 0 {
            return Err(BanterError::invalid_config(
                "budget_secs must be at least 1",
            ));
        }

        self.reset_session();
        self.session_id = uuid::Uuid::new_v4().to_string();
        self.participants = Some(request.participants.clone());
        self.topic = request.topic.clone();
        self.max_turns = request.max_turns;
        self.budget_secs = request.budget_secs;

        info!(
            session = %self.session_id,
            participants = ?request.participants.names(),
            topic = %self.topic,
            max_turns = self.max_turns,
            budget_secs = self.budget_secs,
            "starting conversation"
        );

        self.state = LifecycleState::PreparingPersonas;
        self.spawn_persona_fetch(request.participants);

        Ok(vec![EngineNotice::StateChanged(self.state)])
    }

    /// Stops a running session. No-op otherwise.
    ///
    /// Halts the countdown, silences and empties the playback queue, and
    /// invalidates every in-flight completion. History stays readable and
    /// savable.
    pub fn stop(&mut self) -> Vec<EngineNotice> {
        if !self.state.is_running() {
            return Vec::new();
        }

        info!(session = %self.session_id, "stopping conversation");
        self.epoch += 1;
        self.queue.clear();
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.state = LifecycleState::Stopped;
        vec![EngineNotice::StateChanged(self.state)]
    }

    /// Buffers a user interjection for splicing before the next generated
    /// turn.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for empty text, a non-running session, or an empty
    ///   history (there is nothing to interject into yet)
    /// - `InjectionBusy` while a previous interjection is pending
    pub fn inject_user_turn(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(BanterError::invalid_config(
                "interjection text must be non-empty",
            ));
        }
        if !self.state.is_running() {
            return Err(BanterError::invalid_config(
                "no running conversation to interject into",
            ));
        }
        if self.history.is_empty() {
            return Err(BanterError::invalid_config(
                "cannot interject before the opening turn",
            ));
        }

        self.injection.set(text)?;
        debug!(session = %self.session_id, "user interjection buffered");
        Ok(())
    }

    /// Resets a non-running engine back to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns `InProgress` while a session is running.
    pub fn clear(&mut self) -> Result<Vec<EngineNotice>> {
        if self.state.is_running() {
            return Err(BanterError::InProgress);
        }

        self.reset_session();
        self.participants = None;
        self.topic.clear();
        self.session_id.clear();
        self.state = LifecycleState::Idle;
        Ok(vec![EngineNotice::StateChanged(self.state)])
    }

    /// Builds the persistence draft for an ended conversation.
    ///
    /// Only the durable audio keys are carried over; short-lived playable
    /// URLs never reach storage.
    ///
    /// # Errors
    ///
    /// - `InProgress` while the session is running
    /// - `InvalidConfig` when there is no history to save
    pub fn snapshot_for_save(&self) -> Result<ConversationDraft> {
        if self.state.is_running() {
            return Err(BanterError::InProgress);
        }
        let participants = match (&self.participants, self.history.is_empty()) {
            (Some(participants), false) => participants,
            _ => {
                return Err(BanterError::invalid_config(
                    "nothing to save: the conversation is empty",
                ));
            }
        };

        let messages = self
            .history
            .iter()
            .map(|turn| SavedMessage {
                speaker: turn.speaker.clone(),
                text: turn.text.clone(),
                audio_key: turn.audio.as_ref().and_then(|audio| audio.key.clone()),
                audio_url: None,
            })
            .collect();

        Ok(ConversationDraft {
            participants: [
                participants.first().to_string(),
                participants.second().to_string(),
            ],
            topic: self.topic.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            messages,
        })
    }

    // ========================================================================
    // Event dispatch
    // ========================================================================

    /// Applies one completion event. Stale-epoch events are dropped.
    pub fn dispatch(&mut self, event: EngineEvent) -> Vec<EngineNotice> {
        let epoch = match &event {
            EngineEvent::PersonasFetched { epoch, .. }
            | EngineEvent::TurnGenerated { epoch, .. }
            | EngineEvent::PlaybackSettled { epoch }
            | EngineEvent::BudgetExhausted { epoch } => *epoch,
        };
        if epoch != self.epoch {
            debug!(
                session = %self.session_id,
                stale = epoch,
                current = self.epoch,
                "dropping stale engine event"
            );
            return Vec::new();
        }

        match event {
            EngineEvent::PersonasFetched { result, .. } => self.on_personas_fetched(result),
            EngineEvent::TurnGenerated {
                speaker, result, ..
            } => self.on_turn_generated(speaker, result),
            EngineEvent::PlaybackSettled { .. } => self.on_playback_settled(),
            EngineEvent::BudgetExhausted { .. } => self.on_budget_exhausted(),
        }
    }

    fn on_personas_fetched(&mut self, result: Result<Vec<PersonaSummary>>) -> Vec<EngineNotice> {
        if self.state != LifecycleState::PreparingPersonas {
            warn!(session = %self.session_id, state = ?self.state, "unexpected persona fetch result");
            return Vec::new();
        }

        match result {
            Ok(summaries) => {
                self.summaries = summaries;
                self.countdown = Some(Countdown::start(
                    self.budget_secs,
                    self.events.clone(),
                    self.epoch,
                ));
                self.state = LifecycleState::AwaitingTurn;
                self.request_turn(true);
                vec![EngineNotice::StateChanged(self.state)]
            }
            Err(err) => self.fail(err),
        }
    }

    fn on_turn_generated(&mut self, speaker: String, result: Result<Utterance>) -> Vec<EngineNotice> {
        if self.state != LifecycleState::AwaitingTurn {
            warn!(session = %self.session_id, state = ?self.state, "unexpected turn result");
            return Vec::new();
        }

        match result {
            Ok(utterance) => {
                let turn = Turn::generated(speaker, utterance.text, utterance.audio.clone());
                info!(
                    session = %self.session_id,
                    speaker = %turn.speaker.as_str(),
                    turns = self.history.len() + 1,
                    "turn generated"
                );
                self.history.push(turn.clone());
                self.queue.enqueue(utterance.audio, self.epoch);
                self.state = LifecycleState::Playing;
                vec![
                    EngineNotice::TurnAppended(turn),
                    EngineNotice::StateChanged(self.state),
                ]
            }
            Err(err) => self.fail(err),
        }
    }

    /// The single evaluation point for turn advancement and termination.
    fn on_playback_settled(&mut self) -> Vec<EngineNotice> {
        if !self.state.is_running() {
            return Vec::new();
        }

        let drained = self.queue.settle_head(self.epoch);
        if !drained {
            return Vec::new();
        }

        if let Some(reason) = self.termination_reason() {
            return self.finish(reason);
        }

        let mut notices = Vec::new();
        if let Some(text) = self.injection.take() {
            let turn = Turn::user(text);
            info!(session = %self.session_id, "splicing user interjection");
            self.history.push(turn.clone());
            notices.push(EngineNotice::UserTurnSpliced(turn));
        }

        self.state = LifecycleState::AwaitingTurn;
        self.request_turn(false);
        notices.push(EngineNotice::StateChanged(self.state));
        notices
    }

    fn on_budget_exhausted(&mut self) -> Vec<EngineNotice> {
        if !self.state.is_running() {
            return Vec::new();
        }
        info!(session = %self.session_id, "budget exhausted, finishing after current playback");
        self.budget_exhausted = true;
        Vec::new()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn participants(&self) -> Option<&Participants> {
        self.participants.as_ref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Seconds left on the running countdown, if one is active.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// The upstream failure that moved the session to `Failed`, if any.
    pub fn failure(&self) -> Option<&BanterError> {
        self.failure.as_ref()
    }

    pub fn injection_pending(&self) -> bool {
        self.injection.is_occupied()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reset_session(&mut self) {
        self.epoch += 1;
        self.history.clear();
        self.queue.clear();
        self.injection.clear();
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.summaries.clear();
        self.budget_exhausted = false;
        self.end_reason = None;
        self.failure = None;
    }

    fn termination_reason(&self) -> Option<EndReason> {
        if self.history.len() >= self.max_turns {
            return Some(EndReason::TurnLimit);
        }
        let budget_out = self.budget_exhausted
            || self
                .countdown
                .as_ref()
                .is_some_and(|countdown| countdown.remaining() == 0);
        if budget_out {
            return Some(EndReason::BudgetExhausted);
        }
        None
    }

    fn finish(&mut self, reason: EndReason) -> Vec<EngineNotice> {
        info!(
            session = %self.session_id,
            reason = ?reason,
            turns = self.history.len(),
            "conversation finished"
        );
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.end_reason = Some(reason);
        self.state = LifecycleState::Finished;
        vec![
            EngineNotice::Ended(reason),
            EngineNotice::StateChanged(self.state),
        ]
    }

    fn fail(&mut self, err: BanterError) -> Vec<EngineNotice> {
        warn!(session = %self.session_id, error = %err, "conversation failed");
        self.queue.clear();
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.failure = Some(err.clone());
        self.state = LifecycleState::Failed;
        vec![
            EngineNotice::UpstreamError(err.to_string()),
            EngineNotice::StateChanged(self.state),
        ]
    }

    fn spawn_persona_fetch(&self, participants: Participants) {
        let service = Arc::clone(&self.persona_service);
        let events = self.events.clone();
        let epoch = self.epoch;
        let names: Vec<String> = participants
            .names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        tokio::spawn(async move {
            let mut summaries = Vec::with_capacity(names.len());
            let mut failure = None;
            for name in &names {
                match service.fetch_summary(name).await {
                    Ok(summary) => summaries.push(summary),
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            let result = match failure {
                None => Ok(summaries),
                Some(err) => Err(err),
            };
            let _ = events.send(EngineEvent::PersonasFetched { epoch, result });
        });
    }

    /// Resolves the next speaker and fires the generation request. The
    /// resolved speaker travels with the request and comes back attached to
    /// the completion event, so the appended turn is attributed exactly as
    /// instructed.
    fn request_turn(&mut self, opening: bool) {
        let participants = self
            .participants
            .clone()
            .expect("request_turn called without participants");
        let speaker = next_speaker(&self.history, &participants).to_string();

        debug!(
            session = %self.session_id,
            speaker = %speaker,
            opening,
            "requesting turn"
        );

        let request = TurnRequest {
            participants,
            topic: self.topic.clone(),
            summaries: self.summaries.clone(),
            history: self.history.clone(),
            speaker: speaker.clone(),
        };

        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = if opening {
                gateway.opening_turn(request).await
            } else {
                gateway.next_turn(request).await
            };
            let _ = events.send(EngineEvent::TurnGenerated {
                epoch,
                speaker,
                result,
            });
        });
    }
}
