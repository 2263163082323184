//! mcp-showcase - a session-scoped MCP demo server
//!
//! Serves the showcase capability set over stdio (for MCP clients like
//! Claude Desktop) or streamable HTTP/SSE. Logging goes to stderr via
//! tracing and is disabled in stdio mode so it cannot corrupt the protocol
//! stream.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use showcase_server::{McpServer, ServerMode};

/// mcp-showcase - MCP reference server with elicitation, sampling,
/// subscriptions, completion, and pagination demos
#[derive(Parser, Debug)]
#[command(name = "mcp-showcase")]
#[command(version)]
#[command(about = "MCP showcase server - stdio and HTTP/SSE transports")]
struct Args {
    /// Run in stdio mode (default; for MCP clients like Claude Desktop)
    #[arg(long)]
    stdio: bool,

    /// Run in HTTP mode with the specified port
    #[arg(long)]
    http: bool,

    /// Port for the HTTP server
    #[arg(long, default_value = "3000", env = "MCP_SHOWCASE_PORT")]
    port: u16,

    /// Seconds between resource-updated notification ticks
    #[arg(long, default_value = "10", env = "MCP_SHOWCASE_TICK_SECS")]
    tick_interval_secs: u64,

    /// Seconds between demo log message ticks
    #[arg(long, default_value = "20", env = "MCP_SHOWCASE_LOG_TICK_SECS")]
    log_tick_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the protocol in stdio mode; keep tracing quiet there
    if !args.stdio {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .init();
    }

    let mode = if args.http {
        ServerMode::Http { port: args.port }
    } else {
        ServerMode::Stdio
    };

    let server = McpServer::new()
        .with_mode(mode)
        .with_tick_intervals(args.tick_interval_secs, args.log_tick_secs);

    if !args.stdio {
        match mode {
            ServerMode::Stdio => info!("Starting MCP server in stdio mode"),
            ServerMode::Http { port } => info!("Starting MCP server on http://localhost:{}", port),
        }
    }

    server
        .run()
        .await
        .map_err(|err| anyhow::anyhow!("server error: {}", err))?;

    Ok(())
}
