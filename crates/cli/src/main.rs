//! Intentus CLI: the main entry point.
//!
//! Commands:
//! - `serve`: start the HTTP orchestrator service
//! - `run`: run a single query through the agent
//! - `tools`: list the enabled tools
//! - `config`: print the default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "intentus",
    about = "Intentus: intention orchestration with tool-using language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP orchestrator service
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single query and print the result as JSON
    Run {
        /// The query to answer
        query: String,

        /// Structured context as a JSON object
        #[arg(short, long)]
        context: Option<String>,

        /// Override the step budget
        #[arg(long)]
        max_steps: Option<u32>,

        /// Override the LLM engine, e.g. `vllm-qwen2.5-7b`
        #[arg(short, long)]
        engine: Option<String>,
    },

    /// List the enabled tools
    Tools,

    /// Print the default configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Run {
            query,
            context,
            max_steps,
            engine,
        } => {
            let overrides = commands::run::Overrides {
                context,
                max_steps,
                engine,
                verbose: cli.verbose,
            };
            commands::run::run(&query, overrides).await?
        }
        Commands::Tools => commands::tools::run()?,
        Commands::Config { path } => commands::config_cmd::run(path),
    }

    Ok(())
}
