//! Conversation lifecycle state.
//!
//! One authoritative value per session. Queue contents, the countdown, and
//! the injection slot are subordinate to this state and must stay consistent
//! with it — there are no independent "loading" or "playing" flags.

use serde::{Deserialize, Serialize};

/// The phase of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No session configured.
    Idle,
    /// Persona summaries are being fetched; nothing has been spoken.
    PreparingPersonas,
    /// A generation request is in flight.
    AwaitingTurn,
    /// Audio is playing (or queued) for already-appended turns.
    Playing,
    /// The conversation ended by reaching its turn or time budget.
    Finished,
    /// The user stopped the conversation. History remains readable.
    Stopped,
    /// An upstream collaborator failed. History-so-far remains readable.
    Failed,
}

impl LifecycleState {
    /// States in which the session is actively driving the dialogue.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::PreparingPersonas | Self::AwaitingTurn | Self::Playing
        )
    }

    /// States the session cannot leave except through `clear`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Stopped | Self::Failed)
    }
}

/// Why a conversation entered `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The configured maximum number of turns was appended.
    TurnLimit,
    /// The countdown budget ran out.
    BudgetExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_and_terminal_partition() {
        let running = [
            LifecycleState::PreparingPersonas,
            LifecycleState::AwaitingTurn,
            LifecycleState::Playing,
        ];
        let terminal = [
            LifecycleState::Finished,
            LifecycleState::Stopped,
            LifecycleState::Failed,
        ];

        for state in running {
            assert!(state.is_running());
            assert!(!state.is_terminal());
        }
        for state in terminal {
            assert!(state.is_terminal());
            assert!(!state.is_running());
        }
        assert!(!LifecycleState::Idle.is_running());
        assert!(!LifecycleState::Idle.is_terminal());
    }
}
