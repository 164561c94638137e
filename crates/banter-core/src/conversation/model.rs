//! Conversation domain model.
//!
//! This module contains the core types a conversation is built from:
//! the two fixed participants, individual turns with their optional
//! synthesized audio, and the append-only history.

use crate::error::{BanterError, Result};
use serde::{Deserialize, Serialize};

/// Reserved speaker label for user-authored turns on the wire.
pub const USER_SPEAKER: &str = "User";

/// Who uttered a turn.
///
/// Serialized as the bare persona name, or the literal `"User"` for
/// user-authored interjections, matching the wire and persistence formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    /// One of the two session participants.
    Persona(String),
    /// The human listener interjecting into the dialogue.
    User,
}

impl Speaker {
    /// Creates a persona speaker from a name.
    pub fn persona(name: impl Into<String>) -> Self {
        Self::Persona(name.into())
    }

    /// The wire label for this speaker.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Persona(name) => name,
            Self::User => USER_SPEAKER,
        }
    }

    /// True for user-authored turns.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }

    /// The persona name, if this is a persona turn.
    pub fn persona_name(&self) -> Option<&str> {
        match self {
            Self::Persona(name) => Some(name),
            Self::User => None,
        }
    }
}

impl From<&str> for Speaker {
    fn from(label: &str) -> Self {
        if label == USER_SPEAKER {
            Self::User
        } else {
            Self::Persona(label.to_string())
        }
    }
}

impl Serialize for Speaker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Speaker {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Speaker::from(label.as_str()))
    }
}

/// An opaque, time-limited handle to a playable synthesized-speech resource.
///
/// `url` is a pre-signed link that expires within minutes and must never be
/// persisted; `key` is the stable storage key the persistence collaborator
/// re-signs from when a saved conversation is fetched back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHandle {
    /// Short-lived playable URL.
    pub url: String,
    /// Durable storage key, when the generation service provides one.
    pub key: Option<String>,
}

impl AudioHandle {
    pub fn new(url: impl Into<String>, key: Option<String>) -> Self {
        Self {
            url: url.into(),
            key,
        }
    }
}

/// One utterance in a conversation. Immutable once appended to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
    /// Synthesized audio for generated turns; always `None` for user turns.
    pub audio: Option<AudioHandle>,
}

impl Turn {
    /// Creates a generated persona turn with its audio reference.
    pub fn generated(speaker: impl Into<String>, text: impl Into<String>, audio: AudioHandle) -> Self {
        Self {
            speaker: Speaker::Persona(speaker.into()),
            text: text.into(),
            audio: Some(audio),
        }
    }

    /// Creates a user-authored turn. User turns never carry audio.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            audio: None,
        }
    }
}

/// The two fixed, distinct participants of a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    first: String,
    second: String,
}

impl Participants {
    /// Validates and constructs the participant pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if either name is blank or the names are equal.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Result<Self> {
        let first = first.into();
        let second = second.into();

        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(BanterError::invalid_config(
                "participant names must be non-empty",
            ));
        }
        if first == second {
            return Err(BanterError::invalid_config(format!(
                "participants must be distinct, got '{}' twice",
                first
            )));
        }
        if first == USER_SPEAKER || second == USER_SPEAKER {
            return Err(BanterError::invalid_config(format!(
                "'{}' is reserved for user interjections",
                USER_SPEAKER
            )));
        }

        Ok(Self { first, second })
    }

    /// The participant that opens the conversation by convention.
    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Both names, in listed order.
    pub fn names(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }

    /// True if `name` is one of the two participants.
    pub fn contains(&self, name: &str) -> bool {
        self.first == name || self.second == name
    }

    /// The participant opposite `name`.
    ///
    /// Unknown names resolve to the second participant, mirroring the
    /// alternation rule: the first participant speaks only after the second.
    pub fn other(&self, name: &str) -> &str {
        if name == self.second {
            &self.first
        } else {
            &self.second
        }
    }
}

/// Append-only ordered record of all turns in a session.
///
/// Insertion order is the single source of truth for "who spoke when".
/// Turns are never reordered or mutated in place; the whole history is
/// wiped only when the engine resets a non-running session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// The most recent turn spoken by a participant, skipping trailing
    /// user interjections. `None` when no participant has spoken yet.
    pub fn last_persona_speaker(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find_map(|turn| turn.speaker.persona_name())
    }

    /// Wholesale reset. Only the engine calls this, and only while the
    /// session is not running.
    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participants_rejects_blank_names() {
        assert!(Participants::new("", "Ada").is_err());
        assert!(Participants::new("Ada", "   ").is_err());
    }

    #[test]
    fn test_participants_rejects_duplicates() {
        let err = Participants::new("Ada", "Ada").unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_participants_rejects_reserved_user_label() {
        assert!(Participants::new("User", "Ada").is_err());
        assert!(Participants::new("Ada", "User").is_err());
    }

    #[test]
    fn test_other_flips_between_participants() {
        let participants = Participants::new("Ada", "Grace").unwrap();
        assert_eq!(participants.other("Ada"), "Grace");
        assert_eq!(participants.other("Grace"), "Ada");
    }

    #[test]
    fn test_speaker_serializes_as_bare_label() {
        let persona = serde_json::to_string(&Speaker::persona("Ada")).unwrap();
        assert_eq!(persona, "\"Ada\"");
        let user = serde_json::to_string(&Speaker::User).unwrap();
        assert_eq!(user, "\"User\"");

        let back: Speaker = serde_json::from_str("\"User\"").unwrap();
        assert!(back.is_user());
        let back: Speaker = serde_json::from_str("\"Ada\"").unwrap();
        assert_eq!(back.persona_name(), Some("Ada"));
    }

    #[test]
    fn test_last_persona_speaker_skips_user_turns() {
        let mut history = History::new();
        assert_eq!(history.last_persona_speaker(), None);

        history.push(Turn::generated(
            "Ada",
            "hello",
            AudioHandle::new("https://audio/1", None),
        ));
        history.push(Turn::user("wait, what about tests?"));
        history.push(Turn::user("and docs?"));

        assert_eq!(history.last_persona_speaker(), Some("Ada"));
        assert_eq!(history.len(), 3);
    }
}
