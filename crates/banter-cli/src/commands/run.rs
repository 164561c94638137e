//! The live conversation loop.
//!
//! Engine events and user-typed lines are bridged into one select loop: a
//! rustyline editor runs on its own thread feeding lines over a channel,
//! while the engine's completion events drive the state machine. Plain text
//! becomes an interjection; `/stop`, `/save`, and `/quit` control the
//! session.

use anyhow::Result;
use banter_core::conversation::{
    AudioSink, ConversationEngine, ConversationRepository, EngineNotice, EndReason,
    LifecycleState, Participants, Speaker, StartRequest,
};
use banter_infrastructure::{BanterConfig, HttpConversationRepository, RodioAudioSink, SilentSink};
use banter_interaction::{HttpPersonaService, HttpTurnGateway};
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

pub struct RunArgs {
    pub first: String,
    pub second: String,
    pub topic: String,
    pub max_turns: Option<usize>,
    pub budget_secs: Option<u64>,
    pub no_audio: bool,
}

pub async fn execute(config: BanterConfig, args: RunArgs) -> Result<()> {
    let api = config.api.clone();
    let persona_service = Arc::new(HttpPersonaService::new(api.clone())?);
    let gateway = Arc::new(HttpTurnGateway::new(api.clone())?);
    let sink: Arc<dyn AudioSink> = if args.no_audio || !config.audio.enabled {
        Arc::new(SilentSink)
    } else {
        Arc::new(RodioAudioSink::new(api.timeout_secs)?)
    };
    let repository = HttpConversationRepository::new(api)?;

    let participants = Participants::new(args.first, args.second)?;
    let palette = SpeakerPalette {
        first: participants.first().to_string(),
    };
    let request = StartRequest::new(participants, args.topic)
        .with_max_turns(args.max_turns.unwrap_or(config.conversation.max_turns))
        .with_budget_secs(args.budget_secs.unwrap_or(config.conversation.budget_secs));

    let (mut engine, mut events) = ConversationEngine::new(persona_service, gateway, sink);
    render_notices(&palette, &engine.start(request)?);
    println!(
        "{}",
        "type a line to interject; /stop, /save, /quit".dimmed()
    );

    let mut lines = spawn_line_reader();

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                let notices = engine.dispatch(event);
                render_notices(&palette, &notices);
            }
            maybe_line = lines.recv() => {
                let Some(line) = maybe_line else {
                    break;
                };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/stop" => render_notices(&palette, &engine.stop()),
                    "/save" => save(&engine, &repository).await,
                    text => match engine.inject_user_turn(text) {
                        Ok(()) => println!("{}", "(queued for the next turn)".dimmed()),
                        Err(err) => eprintln!("{}", err.to_string().red()),
                    },
                }
            }
        }
    }

    Ok(())
}

/// Reads lines on a dedicated thread so the editor's blocking prompt never
/// stalls the engine loop.
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(err) => {
                warn!(error = %err, "line editor unavailable, interjections disabled");
                return;
            }
        };
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(rustyline::error::ReadlineError::Interrupted)
                | Err(rustyline::error::ReadlineError::Eof) => {
                    // Closing stdin ends the run loop.
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "line read failed");
                    break;
                }
            }
        }
    });
    rx
}

struct SpeakerPalette {
    first: String,
}

impl SpeakerPalette {
    fn label(&self, speaker: &Speaker) -> colored::ColoredString {
        match speaker {
            Speaker::User => "You".yellow().bold(),
            Speaker::Persona(name) if *name == self.first => name.as_str().cyan().bold(),
            Speaker::Persona(name) => name.as_str().magenta().bold(),
        }
    }
}

fn render_notices(palette: &SpeakerPalette, notices: &[EngineNotice]) {
    for notice in notices {
        match notice {
            EngineNotice::TurnAppended(turn) | EngineNotice::UserTurnSpliced(turn) => {
                println!("{}: {}", palette.label(&turn.speaker), turn.text);
            }
            EngineNotice::StateChanged(state) => match state {
                LifecycleState::PreparingPersonas => {
                    println!("{}", "fetching persona summaries...".dimmed());
                }
                LifecycleState::Stopped => {
                    println!(
                        "{}",
                        "conversation stopped; /save to persist, /quit to exit".dimmed()
                    );
                }
                _ => {}
            },
            EngineNotice::Ended(reason) => {
                let label = match reason {
                    EndReason::TurnLimit => "turn limit reached",
                    EndReason::BudgetExhausted => "time budget exhausted",
                };
                println!(
                    "{}",
                    format!(
                        "conversation finished ({}); /save to persist, /quit to exit",
                        label
                    )
                    .dimmed()
                );
            }
            EngineNotice::UpstreamError(message) => {
                eprintln!("{}", message.red());
            }
        }
    }
}

async fn save(engine: &ConversationEngine, repository: &HttpConversationRepository) {
    match engine.snapshot_for_save() {
        Ok(draft) => match repository.save(&draft).await {
            Ok(id) => println!("saved as {}", id.green()),
            Err(err) => eprintln!("{}", err.to_string().red()),
        },
        Err(err) => eprintln!("{}", err.to_string().red()),
    }
}
