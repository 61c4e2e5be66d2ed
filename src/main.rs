//! Tempo CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tempo::agent::{AgentLoop, CancelFlag, GeminiClient};
use tempo::tools::ToolRegistry;
use tempo::ui;

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Tempo - minimal tool-calling agent loop")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent a question
    Ask {
        /// Message to send to the agent
        message: String,

        /// Print the whole conversation, including tool calls
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the registered tools
    Tools,

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let tools = Arc::new(ToolRegistry::with_defaults()?);

    match cli.command {
        Commands::Ask { message, verbose } => {
            let config = tempo::config::load()?;
            // Missing credentials stop us before the loop starts.
            let client = match GeminiClient::from_config(&config) {
                Ok(client) => client,
                Err(e) => {
                    ui::print_error(&e.to_string());
                    return Err(e.into());
                }
            };

            let cancel = CancelFlag::new();
            install_ctrlc(cancel.clone());

            let agent = AgentLoop::new(client, tools, config.max_iterations)
                .with_cancel_flag(cancel);
            let conversation = agent.run(message).await?;

            if verbose {
                ui::print_transcript(conversation.messages());
            } else {
                ui::print_answer(conversation.final_answer().unwrap_or_default());
            }
        }

        Commands::Tools => {
            for def in tools.definitions() {
                ui::print_step(&format!("{} - {}", def.name, def.description));
            }
        }

        Commands::Status => {
            let config = tempo::config::load()?;
            ui::print_header(&config.model);
            ui::print_step(&format!("Config: {:?}", tempo::config::config_path()));
            ui::print_step(&format!("Endpoint: {}", config.api_base));
            ui::print_step(&format!("Max iterations: {}", config.max_iterations));
            if config.require_api_key().is_ok() {
                ui::print_success("Gemini API key: set");
            } else {
                ui::print_error("Gemini API key: not set");
            }
        }
    }

    Ok(())
}

/// First Ctrl+C stops the loop at the next step boundary, the second exits.
fn install_ctrlc(cancel: CancelFlag) {
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            println!("\n👋 Bye!");
            std::process::exit(130);
        }
        println!("\n⚠️  Stopping after the current step (Ctrl+C again to exit)");
        cancel.cancel();
    })
    .unwrap_or_else(|e| tracing::warn!("Failed to install Ctrl+C handler: {}", e));
}
