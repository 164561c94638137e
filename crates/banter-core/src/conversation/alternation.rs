//! Speaker alternation.
//!
//! The two participants strictly alternate with each other; user
//! interjections sit between generated turns without claiming a slot. This
//! is the single place next-speaker resolution happens — the generation
//! gateway receives the result as an instruction and never re-derives it.

use super::model::{History, Participants};

/// Resolves who speaks the generated turn that follows the current end of
/// history.
///
/// Rules:
/// 1. Empty history: the first listed participant opens, by convention.
/// 2. Otherwise, the most recent *participant* turn decides (trailing user
///    turns are transparent), and the opposite participant speaks next.
pub fn next_speaker<'a>(history: &History, participants: &'a Participants) -> &'a str {
    match history.last_persona_speaker() {
        None => participants.first(),
        Some(last) => participants.other(last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::model::{AudioHandle, Turn};

    fn participants() -> Participants {
        Participants::new("Ada", "Grace").unwrap()
    }

    fn generated(speaker: &str) -> Turn {
        Turn::generated(speaker, "...", AudioHandle::new("https://audio/x", None))
    }

    #[test]
    fn test_empty_history_opens_with_first_participant() {
        let history = History::new();
        assert_eq!(next_speaker(&history, &participants()), "Ada");
    }

    #[test]
    fn test_generated_turns_strictly_alternate() {
        let participants = participants();
        let mut history = History::new();

        let mut speakers = Vec::new();
        for _ in 0..4 {
            let speaker = next_speaker(&history, &participants).to_string();
            history.push(generated(&speaker));
            speakers.push(speaker);
        }

        assert_eq!(speakers, ["Ada", "Grace", "Ada", "Grace"]);
    }

    #[test]
    fn test_user_turns_are_transparent_to_alternation() {
        let participants = participants();
        let mut history = History::new();
        history.push(generated("Ada"));
        history.push(generated("Grace"));
        history.push(Turn::user("hello from the audience"));

        // Grace spoke last among participants, so Ada is still up next.
        assert_eq!(next_speaker(&history, &participants), "Ada");

        history.push(Turn::user("one more thing"));
        assert_eq!(next_speaker(&history, &participants), "Ada");
    }

    #[test]
    fn test_history_starting_with_user_turn_opens_with_first_participant() {
        let participants = participants();
        let mut history = History::new();
        history.push(Turn::user("set the stage"));

        assert_eq!(next_speaker(&history, &participants), "Ada");
    }
}
