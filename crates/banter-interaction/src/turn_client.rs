//! HttpTurnGateway - turn + speech generation over HTTP.
//!
//! One POST per generated turn. The engine's alternation result travels in
//! the request as `nextSpeaker` and is authoritative: a response naming a
//! different speaker is logged and overridden, never trusted.

use banter_core::conversation::{AudioHandle, TurnGateway, TurnRequest, Utterance};
use banter_core::error::{BanterError, Result};
use banter_infrastructure::config::ApiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "generation";

/// Turn generation client for the remote generation collaborator.
#[derive(Clone)]
pub struct HttpTurnGateway {
    client: Client,
    config: ApiConfig,
}

impl HttpTurnGateway {
    /// Creates a client against the configured service address.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BanterError::upstream(SERVICE, format!("client init failed: {}", err)))?;
        Ok(Self { client, config })
    }

    async fn post_turn(&self, path: &str, body: &impl Serialize, instructed: &str) -> Result<Utterance> {
        let url = self.config.endpoint(path);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("request failed: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("request failed with status {}", status),
            };
            return Err(BanterError::upstream(SERVICE, message));
        }

        let parsed: TurnResponse = response
            .json()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("bad response: {}", err)))?;

        debug!(speaker = %instructed, "turn generated");
        Ok(into_utterance(parsed, instructed))
    }
}

#[async_trait::async_trait]
impl TurnGateway for HttpTurnGateway {
    async fn opening_turn(&self, request: TurnRequest) -> Result<Utterance> {
        let body = StartConversationRequest::from(&request);
        self.post_turn("/api/start-conversation", &body, &request.speaker)
            .await
    }

    async fn next_turn(&self, request: TurnRequest) -> Result<Utterance> {
        let body = ContinueConversationRequest::from(&request);
        self.post_turn("/api/continue-conversation", &body, &request.speaker)
            .await
    }
}

/// Maps a wire response onto the instructed speaker's utterance.
///
/// The service may echo its own idea of who speaks; the engine computed that
/// exactly once already, so a disagreement is only worth a warning.
fn into_utterance(response: TurnResponse, instructed: &str) -> Utterance {
    if response.speaker != instructed {
        warn!(
            wire = %response.speaker,
            instructed = %instructed,
            "generation service disagreed on the next speaker; keeping the instruction"
        );
    }
    Utterance {
        text: response.text,
        audio: AudioHandle::new(response.audio_url, response.audio_key),
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Serialize)]
struct StartConversationRequest<'a> {
    personalities: [&'a str; 2],
    topic: &'a str,
    #[serde(rename = "personalityParams")]
    personality_params: HashMap<&'a str, &'a str>,
}

impl<'a> From<&'a TurnRequest> for StartConversationRequest<'a> {
    fn from(request: &'a TurnRequest) -> Self {
        Self {
            personalities: request.participants.names(),
            topic: &request.topic,
            personality_params: summaries_by_name(request),
        }
    }
}

#[derive(Debug, Serialize)]
struct ContinueConversationRequest<'a> {
    #[serde(rename = "conversationHistory")]
    conversation_history: Vec<WireMessage<'a>>,
    personalities: [&'a str; 2],
    topic: &'a str,
    #[serde(rename = "personalityParams")]
    personality_params: HashMap<&'a str, &'a str>,
    #[serde(rename = "nextSpeaker")]
    next_speaker: &'a str,
}

impl<'a> From<&'a TurnRequest> for ContinueConversationRequest<'a> {
    fn from(request: &'a TurnRequest) -> Self {
        Self {
            conversation_history: request
                .history
                .iter()
                .map(|turn| WireMessage {
                    speaker: turn.speaker.as_str(),
                    text: &turn.text,
                })
                .collect(),
            personalities: request.participants.names(),
            topic: &request.topic,
            personality_params: summaries_by_name(request),
            next_speaker: &request.speaker,
        }
    }
}

fn summaries_by_name(request: &TurnRequest) -> HashMap<&str, &str> {
    request
        .summaries
        .iter()
        .map(|summary| (summary.name.as_str(), summary.summary.as_str()))
        .collect()
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    speaker: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TurnResponse {
    speaker: String,
    text: String,
    #[serde(rename = "audioUrl")]
    audio_url: String,
    #[serde(rename = "audioKey")]
    audio_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_core::conversation::{History, Participants, Turn};
    use banter_core::persona::PersonaSummary;

    fn request() -> TurnRequest {
        let mut history = History::new();
        history.push(Turn::generated(
            "Ada",
            "hello",
            AudioHandle::new("https://audio/0", Some("audio/0.mp3".to_string())),
        ));
        history.push(Turn::user("what about testing?"));

        TurnRequest {
            participants: Participants::new("Ada", "Grace").unwrap(),
            topic: "compilers".to_string(),
            summaries: vec![
                PersonaSummary {
                    name: "Ada".to_string(),
                    summary: "analytical".to_string(),
                },
                PersonaSummary {
                    name: "Grace".to_string(),
                    summary: "pragmatic".to_string(),
                },
            ],
            history,
            speaker: "Grace".to_string(),
        }
    }

    #[test]
    fn test_continue_request_wire_format() {
        let request = request();
        let value = serde_json::to_value(ContinueConversationRequest::from(&request)).unwrap();

        assert_eq!(value["personalities"], serde_json::json!(["Ada", "Grace"]));
        assert_eq!(value["nextSpeaker"], "Grace");
        assert_eq!(value["personalityParams"]["Ada"], "analytical");
        assert_eq!(
            value["conversationHistory"],
            serde_json::json!([
                { "speaker": "Ada", "text": "hello" },
                { "speaker": "User", "text": "what about testing?" }
            ])
        );
    }

    #[test]
    fn test_start_request_has_no_history() {
        let request = request();
        let value = serde_json::to_value(StartConversationRequest::from(&request)).unwrap();
        assert!(value.get("conversationHistory").is_none());
        assert_eq!(value["topic"], "compilers");
    }

    #[test]
    fn test_wire_speaker_disagreement_keeps_the_instruction() {
        let response = TurnResponse {
            speaker: "Ada".to_string(),
            text: "well, actually".to_string(),
            audio_url: "https://signed/clip.mp3".to_string(),
            audio_key: Some("audio/clip.mp3".to_string()),
        };

        let utterance = into_utterance(response, "Grace");
        assert_eq!(utterance.text, "well, actually");
        assert_eq!(utterance.audio.url, "https://signed/clip.mp3");
        assert_eq!(utterance.audio.key.as_deref(), Some("audio/clip.mp3"));
    }

    #[test]
    fn test_turn_response_parses_wire_fields() {
        let parsed: TurnResponse = serde_json::from_str(
            r#"{
                "speaker": "Grace",
                "text": "in my day we had nanoseconds",
                "audioUrl": "https://signed/clip.mp3",
                "audioKey": "audio/clip.mp3"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.speaker, "Grace");
        assert_eq!(parsed.audio_key.as_deref(), Some("audio/clip.mp3"));
    }
}
