//! tanyahr CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize the config file
//! - `chat`    — Interactive chat or single-question mode (default)

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tanyahr",
    about = "tanyahr — Asisten AI Biro SDM & Organisasi Komdigi",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration file
    Onboard,

    /// Chat with the HR assistant
    Chat {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Onboard) => commands::onboard::run().await?,
        Some(Commands::Chat { question }) => commands::chat::run(question).await?,
        None => commands::chat::run(None).await?,
    }

    Ok(())
}
