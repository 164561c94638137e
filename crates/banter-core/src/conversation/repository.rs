//! Conversation persistence contract.
//!
//! Defines the interface to the external persistence collaborator. The
//! engine never talks to it directly; a terminal session is first turned
//! into a [`ConversationDraft`] and handed over by the caller.

use super::model::Speaker;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the persistence service on save.
pub type ConversationId = String;

/// One persisted message.
///
/// Only the durable `audio_key` is stored; the short-lived playable URL is
/// re-derived by the service on retrieval and is `None` for user turns and
/// for messages whose audio was never keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub speaker: Speaker,
    pub text: String,
    pub audio_key: Option<String>,
    /// Freshly re-signed playable URL. Populated by `get`, never by `save`.
    pub audio_url: Option<String>,
}

/// A finished conversation ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDraft {
    pub participants: [String; 2],
    pub topic: String,
    /// RFC 3339 creation timestamp.
    pub timestamp: String,
    pub messages: Vec<SavedMessage>,
}

/// A conversation fetched back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConversation {
    pub id: ConversationId,
    pub participants: Vec<String>,
    pub topic: String,
    pub timestamp: String,
    pub messages: Vec<SavedMessage>,
}

/// Listing entry for saved conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub participants: Vec<String>,
    pub topic: String,
    pub timestamp: String,
}

/// An abstract repository for completed conversations.
///
/// The backing service owns audio re-signing: `get` returns messages whose
/// `audio_url` is freshly derived from each stored `audio_key`.
#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Persists a draft and returns the assigned conversation id.
    async fn save(&self, draft: &ConversationDraft) -> Result<ConversationId>;

    /// Fetches one conversation with re-signed audio URLs.
    async fn get(&self, id: &str) -> Result<SavedConversation>;

    /// Lists summaries of all saved conversations.
    async fn list(&self) -> Result<Vec<ConversationSummary>>;
}
