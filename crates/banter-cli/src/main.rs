use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "banter")]
#[command(about = "Banter - simulated two-persona dialogue with synthesized speech", long_about = None)]
struct Cli {
    /// Alternate configuration file (default: ~/.config/banter/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live conversation between two personas
    Run {
        /// First participant; opens the conversation
        #[arg(long)]
        first: String,
        /// Second participant
        #[arg(long)]
        second: String,
        /// Topic the personas talk about
        #[arg(long)]
        topic: String,
        /// Maximum number of turns, user interjections included
        #[arg(long)]
        max_turns: Option<usize>,
        /// Conversation time budget in seconds
        #[arg(long)]
        budget_secs: Option<u64>,
        /// Skip local audio playback for this run
        #[arg(long)]
        no_audio: bool,
    },
    /// List saved conversations
    List,
    /// Print a saved conversation, optionally replaying its audio
    Show {
        /// Conversation id as reported on save
        id: String,
        /// Replay each turn's audio sequentially
        #[arg(long)]
        play: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => banter_infrastructure::BanterConfig::load_from(path)?,
        None => banter_infrastructure::BanterConfig::load()?,
    };
    if cli.config.is_some() {
        config.apply_env_overrides();
    }

    match cli.command {
        Commands::Run {
            first,
            second,
            topic,
            max_turns,
            budget_secs,
            no_audio,
        } => {
            commands::run::execute(
                config,
                commands::run::RunArgs {
                    first,
                    second,
                    topic,
                    max_turns,
                    budget_secs,
                    no_audio,
                },
            )
            .await
        }
        Commands::List => commands::list::execute(config).await,
        Commands::Show { id, play } => commands::show::execute(config, &id, play).await,
    }
}
