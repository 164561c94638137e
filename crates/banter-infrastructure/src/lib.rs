pub mod audio;
pub mod config;
pub mod http_conversation_repository;

pub use audio::{RodioAudioSink, SilentSink};
pub use config::{ApiConfig, AudioConfig, BanterConfig, ConversationDefaults};
pub use http_conversation_repository::HttpConversationRepository;
