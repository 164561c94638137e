//! Listing saved conversations.

use anyhow::Result;
use banter_core::conversation::ConversationRepository;
use banter_infrastructure::{BanterConfig, HttpConversationRepository};
use colored::Colorize;

pub async fn execute(config: BanterConfig) -> Result<()> {
    let repository = HttpConversationRepository::new(config.api)?;
    let summaries = repository.list().await?;

    if summaries.is_empty() {
        println!("no saved conversations");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {}  {}  {}",
            summary.id.bold(),
            summary.participants.join(" & "),
            summary.topic,
            summary.timestamp.dimmed()
        );
    }
    Ok(())
}
