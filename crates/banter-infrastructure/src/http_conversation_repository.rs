//! HTTP-backed ConversationRepository implementation.
//!
//! Talks to the persistence collaborator, which owns durable storage and
//! audio re-signing: `get` comes back with a fresh playable URL derived from
//! each stored audio key.

use crate::config::ApiConfig;
use banter_core::conversation::{
    ConversationDraft, ConversationId, ConversationRepository, ConversationSummary,
    SavedConversation, SavedMessage, Speaker,
};
use banter_core::error::{BanterError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const SERVICE: &str = "persistence";

/// A repository implementation storing conversations through the remote
/// persistence service.
pub struct HttpConversationRepository {
    client: Client,
    config: ApiConfig,
}

impl HttpConversationRepository {
    /// Creates a repository client against the configured service address.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BanterError::upstream(SERVICE, format!("client init failed: {}", err)))?;
        Ok(Self { client, config })
    }

    async fn error_from(response: reqwest::Response) -> BanterError {
        let status = response.status();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("request failed with status {}", status),
        };
        BanterError::upstream(SERVICE, message)
    }
}

#[async_trait::async_trait]
impl ConversationRepository for HttpConversationRepository {
    async fn save(&self, draft: &ConversationDraft) -> Result<ConversationId> {
        let url = self.config.endpoint("/api/save-conversation");
        let body = SaveConversationRequest::from(draft);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("save failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: SaveConversationResponse = response
            .json()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("bad save response: {}", err)))?;
        info!(conversation = %parsed.conversation_id, "conversation saved");
        Ok(parsed.conversation_id)
    }

    async fn get(&self, id: &str) -> Result<SavedConversation> {
        let url = self.config.endpoint(&format!("/api/get-conversation/{}", id));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("get failed: {}", err)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BanterError::not_found("conversation", id));
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: GetConversationResponse = response
            .json()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("bad get response: {}", err)))?;
        Ok(parsed.conversation.into())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let url = self.config.endpoint("/api/get-conversations");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("list failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: ListConversationsResponse = response
            .json()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("bad list response: {}", err)))?;
        Ok(parsed.conversations.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct SaveConversationRequest<'a> {
    personalities: [&'a str; 2],
    topic: &'a str,
    timestamp: &'a str,
    messages: Vec<SaveMessageDto<'a>>,
}

#[derive(Debug, Serialize)]
struct SaveMessageDto<'a> {
    speaker: &'a str,
    text: &'a str,
    #[serde(rename = "audioKey")]
    audio_key: Option<&'a str>,
}

impl<'a> From<&'a ConversationDraft> for SaveConversationRequest<'a> {
    fn from(draft: &'a ConversationDraft) -> Self {
        Self {
            personalities: [&draft.participants[0], &draft.participants[1]],
            topic: &draft.topic,
            timestamp: &draft.timestamp,
            messages: draft
                .messages
                .iter()
                .map(|message| SaveMessageDto {
                    speaker: message.speaker.as_str(),
                    text: &message.text,
                    audio_key: message.audio_key.as_deref(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveConversationResponse {
    #[serde(rename = "conversationId")]
    conversation_id: String,
}

#[derive(Debug, Deserialize)]
struct ListConversationsResponse {
    conversations: Vec<ConversationSummaryDto>,
}

#[derive(Debug, Deserialize)]
struct ConversationSummaryDto {
    #[serde(rename = "conversationId")]
    conversation_id: String,
    personalities: Vec<String>,
    topic: String,
    timestamp: String,
}

impl From<ConversationSummaryDto> for ConversationSummary {
    fn from(dto: ConversationSummaryDto) -> Self {
        Self {
            id: dto.conversation_id,
            participants: dto.personalities,
            topic: dto.topic,
            timestamp: dto.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetConversationResponse {
    conversation: ConversationDto,
}

#[derive(Debug, Deserialize)]
struct ConversationDto {
    #[serde(rename = "conversationId")]
    conversation_id: String,
    personalities: Vec<String>,
    topic: String,
    timestamp: String,
    #[serde(default)]
    messages: Vec<SavedMessageDto>,
}

#[derive(Debug, Deserialize)]
struct SavedMessageDto {
    speaker: String,
    text: String,
    #[serde(rename = "audioKey")]
    audio_key: Option<String>,
    #[serde(rename = "audioUrl")]
    audio_url: Option<String>,
}

impl From<ConversationDto> for SavedConversation {
    fn from(dto: ConversationDto) -> Self {
        Self {
            id: dto.conversation_id,
            participants: dto.personalities,
            topic: dto.topic,
            timestamp: dto.timestamp,
            messages: dto
                .messages
                .into_iter()
                .map(|message| SavedMessage {
                    speaker: Speaker::from(message.speaker.as_str()),
                    text: message.text,
                    audio_key: message.audio_key,
                    audio_url: message.audio_url,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_request_carries_keys_not_urls() {
        let draft = ConversationDraft {
            participants: ["Ada".to_string(), "Grace".to_string()],
            topic: "compilers".to_string(),
            timestamp: "2024-05-01T12:00:00Z".to_string(),
            messages: vec![
                SavedMessage {
                    speaker: Speaker::persona("Ada"),
                    text: "hello".to_string(),
                    audio_key: Some("audio/1.mp3".to_string()),
                    audio_url: None,
                },
                SavedMessage {
                    speaker: Speaker::User,
                    text: "a question".to_string(),
                    audio_key: None,
                    audio_url: None,
                },
            ],
        };

        let value = serde_json::to_value(SaveConversationRequest::from(&draft)).unwrap();
        assert_eq!(value["personalities"], serde_json::json!(["Ada", "Grace"]));
        assert_eq!(value["messages"][0]["audioKey"], "audio/1.mp3");
        assert_eq!(value["messages"][1]["speaker"], "User");
        assert!(value["messages"][0].get("audioUrl").is_none());
    }

    #[test]
    fn test_get_response_maps_resigned_urls() {
        let body = serde_json::json!({
            "conversation": {
                "conversationId": "c-1",
                "personalities": ["Ada", "Grace"],
                "topic": "compilers",
                "timestamp": "2024-05-01T12:00:00Z",
                "messages": [
                    {
                        "speaker": "Ada",
                        "text": "hello",
                        "audioKey": "audio/1.mp3",
                        "audioUrl": "https://signed/audio/1.mp3"
                    },
                    {
                        "speaker": "User",
                        "text": "a question",
                        "audioKey": null,
                        "audioUrl": null
                    }
                ]
            }
        });

        let parsed: GetConversationResponse = serde_json::from_value(body).unwrap();
        let conversation: SavedConversation = parsed.conversation.into();

        assert_eq!(conversation.id, "c-1");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(
            conversation.messages[0].audio_url.as_deref(),
            Some("https://signed/audio/1.mp3")
        );
        assert!(conversation.messages[1].speaker.is_user());
        assert!(conversation.messages[1].audio_url.is_none());
    }

    #[test]
    fn test_list_response_maps_summaries() {
        let body = serde_json::json!({
            "conversations": [
                {
                    "conversationId": "c-1",
                    "personalities": ["Ada", "Grace"],
                    "topic": "compilers",
                    "timestamp": "2024-05-01T12:00:00Z"
                }
            ]
        });

        let parsed: ListConversationsResponse = serde_json::from_value(body).unwrap();
        let summaries: Vec<ConversationSummary> =
            parsed.conversations.into_iter().map(Into::into).collect();
        assert_eq!(summaries[0].id, "c-1");
        assert_eq!(summaries[0].topic, "compilers");
    }
}
