//! Gmail MCP server binary
//!
//! `gmail-mcp auth` runs the interactive authorization flow once; with no
//! subcommand the MCP server runs on stdio.

use clap::{Parser, Subcommand};

use gmail_mcp::config::Config;
use gmail_mcp::error::Result;
use gmail_mcp::gmail::auth::authorize_interactive;
use gmail_mcp::mcp::server::McpServer;

/// Gmail MCP server
#[derive(Parser)]
#[command(name = "gmail-mcp")]
#[command(author, version, about = "MCP server exposing Gmail tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize Gmail access (run this first)
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout is the MCP transport; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Some(Commands::Auth) => {
            // The one place an error is fatal to the whole process.
            if let Err(e) = authorize_interactive(&config).await {
                eprintln!("Authorization failed: {}", e);
                std::process::exit(1);
            }
            eprintln!("Authorization completed successfully.");
        }
        None => {
            if !config.token_exists() {
                tracing::warn!(
                    "no token file at {}; tool calls will fail until 'gmail-mcp auth' is run",
                    config.token_path.display()
                );
            }

            let mut server = McpServer::new(config);
            server.run_stdio().await?;
        }
    }

    Ok(())
}
