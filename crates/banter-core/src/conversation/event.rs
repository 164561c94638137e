//! Events that drive the engine, and notices it emits back.

use super::gateway::Utterance;
use super::lifecycle::{EndReason, LifecycleState};
use super::model::Turn;
use crate::error::Result;
use crate::persona::PersonaSummary;

/// Completion events posted to the engine's event channel by spawned work.
///
/// Every event carries the epoch current when the work was spawned; the
/// engine drops events whose epoch is stale, which is what makes a late
/// generation result after `stop` or `clear` a structural no-op.
#[derive(Debug)]
pub enum EngineEvent {
    /// Both persona summaries were fetched (or the fetch failed).
    PersonasFetched {
        epoch: u64,
        result: Result<Vec<PersonaSummary>>,
    },
    /// A generation request resolved.
    TurnGenerated {
        epoch: u64,
        /// The speaker instruction recorded when the request was spawned.
        speaker: String,
        result: Result<Utterance>,
    },
    /// The head of the playback queue finished (or failed and was skipped).
    PlaybackSettled { epoch: u64 },
    /// The countdown reached zero.
    BudgetExhausted { epoch: u64 },
}

/// Outward notifications for whatever front end drives the engine.
#[derive(Debug, Clone)]
pub enum EngineNotice {
    /// The lifecycle state changed.
    StateChanged(LifecycleState),
    /// A generated turn was appended to history.
    TurnAppended(Turn),
    /// A pending user interjection was spliced into history.
    UserTurnSpliced(Turn),
    /// The conversation reached a natural end.
    Ended(EndReason),
    /// An upstream collaborator failed; the session is now `Failed`.
    UpstreamError(String),
}
