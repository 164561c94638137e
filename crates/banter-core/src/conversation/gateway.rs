//! Boundary abstraction over the external turn + speech generation service.

use super::model::{History, Participants};
use crate::error::Result;
use crate::persona::PersonaSummary;
use serde::{Deserialize, Serialize};

use super::model::AudioHandle;

/// A generated utterance, deliberately speakerless.
///
/// The engine's alternation result is authoritative: the turn is attributed
/// to the speaker named in the [`TurnRequest`], never to anything the
/// downstream service claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// The generated dialogue text.
    pub text: String,
    /// Playable reference to the synthesized speech for this text.
    pub audio: AudioHandle,
}

/// Everything the generation service needs for one new turn.
///
/// An owned snapshot: generation runs in a spawned task while the engine
/// keeps mutating its own state.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub participants: Participants,
    pub topic: String,
    pub summaries: Vec<PersonaSummary>,
    /// History up to (and excluding) the requested turn.
    pub history: History,
    /// The participant instructed to speak, resolved by the engine.
    pub speaker: String,
}

/// Abstraction over the external generation call.
///
/// One call produces one new turn plus its audio reference. The callee maps
/// history into its own downstream protocol however it likes, but it MUST
/// honor `TurnRequest::speaker` rather than recomputing alternation — two
/// independent computations can disagree once user turns are present.
#[async_trait::async_trait]
pub trait TurnGateway: Send + Sync {
    /// Generates the opening turn of a conversation (empty history).
    async fn opening_turn(&self, request: TurnRequest) -> Result<Utterance>;

    /// Generates the turn following `request.history`.
    async fn next_turn(&self, request: TurnRequest) -> Result<Utterance>;
}
