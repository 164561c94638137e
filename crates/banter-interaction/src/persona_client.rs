//! HttpPersonaService - persona summary retrieval over HTTP.
//!
//! One POST per participant, made once during session preparation. The
//! response summary feeds every subsequent generation request verbatim.

use banter_core::error::{BanterError, Result};
use banter_core::persona::{PersonaService, PersonaSummary};
use banter_infrastructure::config::ApiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "persona";

/// Persona summary client for the remote generation collaborator.
#[derive(Clone)]
pub struct HttpPersonaService {
    client: Client,
    config: ApiConfig,
}

impl HttpPersonaService {
    /// Creates a client against the configured service address.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BanterError::upstream(SERVICE, format!("client init failed: {}", err)))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl PersonaService for HttpPersonaService {
    async fn fetch_summary(&self, persona_name: &str) -> Result<PersonaSummary> {
        let url = self.config.endpoint("/api/get-persona-params");
        debug!(persona = %persona_name, "fetching persona summary");

        let response = self
            .client
            .post(url)
            .json(&PersonaParamsRequest {
                personality_name: persona_name,
            })
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

        let parsed: PersonaParamsResponse = response
            .json()
            .await
            .map_err(|err| BanterError::upstream(SERVICE, format!("bad response: {}", err)))?;

        Ok(PersonaSummary {
            name: persona_name.to_string(),
            summary: parsed.summary,
        })
    }
}

#[derive(Debug, Serialize)]
struct PersonaParamsRequest<'a> {
    #[serde(rename = "personalityName")]
    personality_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct PersonaParamsResponse {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_the_wire_field_name() {
        let value = serde_json::to_value(PersonaParamsRequest {
            personality_name: "Ada Lovelace",
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "personalityName": "Ada Lovelace" }));
    }

    #[test]
    fn test_response_parses_summary() {
        let parsed: PersonaParamsResponse =
            serde_json::from_str(r#"{ "summary": "analytical, visionary" }"#).unwrap();
        assert_eq!(parsed.summary, "analytical, visionary");
    }
}
