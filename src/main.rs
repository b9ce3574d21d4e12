//! Paloma DEX agent CLI
//!
//! Serves the agent tool surface over stdio, or runs single tools by hand.
//! Logs go to stderr; stdout carries tool responses only.

use clap::{Parser, Subcommand};
use paloma_dex_agent::{AppContext, Config, Error, Result, ToolRegistry, ToolServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "padex-agent")]
#[command(about = "Paloma DEX trading tools for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve line-delimited JSON tool requests on stdin/stdout
    Serve,

    /// Print the tool catalogue with input schemas
    Tools,

    /// Run one tool and print its response
    Call {
        /// Tool name (see `tools`)
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// List supported chains and their configured contracts
    Chains,

    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve => {
            let ctx = Arc::new(AppContext::from_env(config)?);
            ToolServer::new(ctx, ToolRegistry::with_defaults())
                .serve_stdio()
                .await?;
        }
        Commands::Tools => {
            print_json(&ToolRegistry::with_defaults().catalogue())?;
        }
        Commands::Call { tool, args } => {
            let args: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| Error::Validation(format!("--args is not valid JSON: {}", e)))?;
            let ctx = AppContext::from_env(config)?;
            let response = ToolRegistry::with_defaults().respond(&ctx, &tool, args).await;
            print_json(&response)?;
        }
        Commands::Chains => {
            let ctx = AppContext::from_env(config)?;
            let response = ToolRegistry::with_defaults()
                .respond(&ctx, "list_supported_chains", serde_json::json!({}))
                .await;
            print_json(&response)?;
        }
        Commands::Config => {
            print_json(&config)?;
        }
    }

    Ok(())
}
