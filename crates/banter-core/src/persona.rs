//! Persona summaries and the service that produces them.
//!
//! A persona summary is a free-text description of a named personality's
//! public speaking style, fetched once per participant before a conversation
//! starts and passed to every subsequent generation request.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A fetched description of one participant's public persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSummary {
    /// The persona's display name, as configured for the session.
    pub name: String,
    /// Free-text summary of traits, tone, and mannerisms.
    pub summary: String,
}

/// An abstract source of persona summaries.
///
/// Implementations talk to whatever service derives the summary (the
/// reference collaborator is an LLM behind an HTTP endpoint). Errors are
/// surfaced verbatim; the engine does not retry.
#[async_trait::async_trait]
pub trait PersonaService: Send + Sync {
    /// Fetches the persona summary for a single personality name.
    ///
    /// # Returns
    ///
    /// - `Ok(PersonaSummary)`: the summary to feed into turn generation
    /// - `Err(BanterError)`: transport or validation failure from the collaborator
    async fn fetch_summary(&self, persona_name: &str) -> Result<PersonaSummary>;
}
