//! Configuration file management for Banter.
//!
//! Settings load from `~/.config/banter/config.toml`; a missing file yields
//! the defaults, and `BANTER_API_BASE_URL` overrides the configured service
//! address.

use banter_core::error::{BanterError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[api] base_url`.
pub const API_BASE_URL_ENV: &str = "BANTER_API_BASE_URL";

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_turns() -> usize {
    10
}

fn default_budget_secs() -> u64 {
    120
}

fn default_audio_enabled() -> bool {
    true
}

/// Address and timeout for the generation and persistence service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL without trailing slash (e.g. https://banter.example.com).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Generation calls synthesize speech and can be slow.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Default turn and time budgets for new conversations.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationDefaults {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_budget_secs")]
    pub budget_secs: u64,
}

impl Default for ConversationDefaults {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            budget_secs: default_budget_secs(),
        }
    }
}

/// Local audio output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Disable to run text-only (playback settles instantly).
    #[serde(default = "default_audio_enabled")]
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
        }
    }
}

/// Root configuration structure for config.toml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BanterConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub conversation: ConversationDefaults,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl BanterConfig {
    /// Loads the configuration from the default location, falling back to
    /// defaults when no file exists, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads the configuration from an explicit file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            BanterError::io(format!(
                "failed to read configuration file at {}: {}",
                path.display(),
                err
            ))
        })?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Applies environment variable overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }
    }

    /// Returns the path to the configuration file:
    /// `~/.config/banter/config.toml`
    fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BanterError::io("could not determine home directory"))?;
        Ok(home.join(".config").join("banter").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: BanterConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.conversation.max_turns, 10);
        assert_eq!(config.conversation.budget_secs, 120);
        assert!(config.audio.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "[api]\nbase_url = \"https://banter.example.com\"\ntimeout_secs = 30\n\n\
             [conversation]\nmax_turns = 6\n\n[audio]\nenabled = false\n"
        )
        .unwrap();

        let config = BanterConfig::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://banter.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.conversation.max_turns, 6);
        assert_eq!(config.conversation.budget_secs, 120);
        assert!(!config.audio.enabled);
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = BanterConfig::load_from(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, BanterError::Io { .. }));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let api = ApiConfig {
            base_url: "https://banter.example.com/".to_string(),
            timeout_secs: 60,
        };
        assert_eq!(
            api.endpoint("/api/get-persona-params"),
            "https://banter.example.com/api/get-persona-params"
        );
    }
}
