//! Printing and replaying a saved conversation.

use anyhow::Result;
use banter_core::conversation::{
    AudioHandle, AudioSink, ConversationRepository, EngineEvent, PlaybackQueue,
    SavedConversation,
};
use banter_infrastructure::{BanterConfig, HttpConversationRepository, RodioAudioSink};
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn execute(config: BanterConfig, id: &str, play: bool) -> Result<()> {
    let repository = HttpConversationRepository::new(config.api.clone())?;
    let conversation = repository.get(id).await?;

    println!(
        "{} — {}",
        conversation.participants.join(" & ").bold(),
        conversation.topic
    );
    println!("{}", conversation.timestamp.dimmed());
    println!();

    let opener = conversation.participants.first().cloned().unwrap_or_default();
    for message in &conversation.messages {
        let label = if message.speaker.is_user() {
            "You".yellow().bold()
        } else if message.speaker.as_str() == opener {
            message.speaker.as_str().cyan().bold()
        } else {
            message.speaker.as_str().magenta().bold()
        };
        println!("{}: {}", label, message.text);
    }

    if play {
        replay(&config, &conversation).await?;
    }
    Ok(())
}

/// Replays the conversation's re-signed audio through the same queue the
/// live session uses: strictly sequential, broken clips skipped.
async fn replay(config: &BanterConfig, conversation: &SavedConversation) -> Result<()> {
    let sink: Arc<dyn AudioSink> = Arc::new(RodioAudioSink::new(config.api.timeout_secs)?);
    let (events, mut settled) = mpsc::unbounded_channel();
    let mut queue = PlaybackQueue::new(sink, events);

    let mut pending = 0usize;
    for message in &conversation.messages {
        if let Some(url) = &message.audio_url {
            queue.enqueue(
                AudioHandle::new(url.clone(), message.audio_key.clone()),
                0,
            );
            pending += 1;
        }
    }
    if pending == 0 {
        println!("{}", "no audio attached to this conversation".dimmed());
        return Ok(());
    }

    while pending > 0 {
        match settled.recv().await {
            Some(EngineEvent::PlaybackSettled { .. }) => {
                queue.settle_head(0);
                pending -= 1;
            }
            Some(_) => {}
            None => break,
        }
    }
    Ok(())
}
