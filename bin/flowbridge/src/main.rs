mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "flowbridge")]
#[command(about = "Glue components for a visual flow-orchestration framework", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the event dispatch gateway (long-running daemon)
    Gateway {
        /// Port to listen on (overrides config gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config gateway.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Send a prompt to the configured inference endpoint
    Infer {
        prompt: String,

        /// Stop token; may be given multiple times
        #[arg(long)]
        stop: Vec<String>,
    },

    /// Embed a text through the configured inference endpoint
    Embed { text: String },

    /// Interactive chat with conversation memory (Ctrl+D to exit)
    Chat {
        /// System instructions placed ahead of the conversation
        #[arg(long, default_value = "You are a helpful assistant.")]
        pre_prompt: String,
    },

    /// Inspect and run registered tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },

    /// Inspect persisted flows
    Flows {
        #[command(subcommand)]
        command: FlowsCommands,
    },
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List registered tools
    List,

    /// Invoke a tool by name with a single string argument
    Run { name: String, argument: String },
}

#[derive(Subcommand)]
enum FlowsCommands {
    /// Look up a flow definition by name
    Get { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Gateway { port, host } => {
            commands::gateway::run(host, port).await?;
        }
        Commands::Infer { prompt, stop } => {
            commands::infer_cmd::run(&prompt, &stop).await?;
        }
        Commands::Embed { text } => {
            commands::infer_cmd::run_embed(&text).await?;
        }
        Commands::Chat { pre_prompt } => {
            commands::chat::run(&pre_prompt).await?;
        }
        Commands::Tools { command } => match command {
            ToolsCommands::List => commands::tools_cmd::list()?,
            ToolsCommands::Run { name, argument } => {
                commands::tools_cmd::run(&name, &argument).await?;
            }
        },
        Commands::Flows { command } => match command {
            FlowsCommands::Get { name } => {
                commands::flows_cmd::get(&name).await?;
            }
        },
    }

    Ok(())
}
