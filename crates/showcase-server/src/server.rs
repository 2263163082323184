//! Main MCP server orchestration

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use showcase_core::{RequestBroker, SessionRegistry, TickerConfig, Tickers};

use crate::capability;
use crate::protocol::Dispatcher;
use crate::transport::{HttpTransport, StdioTransport};

/// Server mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// stdio transport (for MCP clients like Claude Desktop)
    #[default]
    Stdio,
    /// Streamable HTTP/SSE transport
    Http { port: u16 },
}

/// MCP showcase server
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    mode: ServerMode,
    tickers: TickerConfig,
}

impl McpServer {
    /// Create a new server with the registries built once at start
    pub fn new() -> Self {
        let broker = Arc::new(RequestBroker::new());
        let sessions = Arc::new(SessionRegistry::new(broker.clone()));

        let dispatcher = Arc::new(Dispatcher::new(
            sessions,
            broker,
            capability::tools::build_registry(),
            capability::resources::build_registry(),
            capability::prompts::build_registry(),
            capability::completions(),
        ));

        Self {
            dispatcher,
            mode: ServerMode::default(),
            tickers: TickerConfig::default(),
        }
    }

    /// Set the server mode
    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the background ticker cadences
    pub fn with_tick_intervals(mut self, resource_secs: u64, log_secs: u64) -> Self {
        self.tickers = TickerConfig {
            resource_interval: Duration::from_secs(resource_secs),
            log_interval: Duration::from_secs(log_secs),
        };
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run the server: start the background tickers, serve the transport,
    /// and stop the tickers before returning so no timer outlives us.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let tickers = Tickers::start(self.dispatcher.sessions().clone(), self.tickers);

        let served = match self.mode {
            ServerMode::Stdio => {
                info!("Starting MCP server in stdio mode");
                let mut transport = StdioTransport::new(self.dispatcher.clone());
                transport.run().await
            }
            ServerMode::Http { port } => {
                info!("Starting MCP server in HTTP mode on port {}", port);
                let transport = HttpTransport::new(self.dispatcher.clone(), port);
                transport.run().await
            }
        };

        tickers.stop().await;
        served
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}
