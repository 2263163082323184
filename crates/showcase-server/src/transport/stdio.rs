//! stdio transport
//!
//! Line-delimited JSON over stdin/stdout with one implicit session, created
//! at startup and destroyed on EOF. Requests are dispatched on their own
//! tasks so a handler suspended on a broker round trip cannot stall the
//! read loop that will deliver its reply.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::protocol::{Dispatcher, McpError, McpMessage};

/// stdio transport for the MCP protocol
pub struct StdioTransport {
    dispatcher: Arc<Dispatcher>,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run the stdio transport until EOF
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting MCP server on stdio");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);

        // one channel to stdout: session notifications, broker requests, and
        // task responses all interleave through it
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let session = self.dispatcher.sessions().create(tx.clone());
        debug!("stdio session {}", session.id);

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(envelope) = rx.recv().await {
                let line = envelope.to_string();
                if stdout.write_all(line.as_bytes()).await.is_err()
                    || stdout.write_all(b"\n").await.is_err()
                    || stdout.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let mut line = String::new();
        loop {
            line.clear();

            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            let message: McpMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(err) => {
                    error!("Failed to parse message: {}", err);
                    let response = McpMessage::error_response(None, McpError::parse_error());
                    let _ = tx.send(serde_json::to_value(&response)?);
                    continue;
                }
            };

            // replies to server-initiated requests go straight to the broker
            if message.is_response() {
                self.dispatcher.accept_reply(&message);
                continue;
            }

            let dispatcher = self.dispatcher.clone();
            let session = session.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = dispatcher.dispatch(&session, message).await {
                    match serde_json::to_value(&response) {
                        Ok(envelope) => {
                            let _ = tx.send(envelope);
                        }
                        Err(err) => error!("Failed to serialize response: {}", err),
                    }
                }
            });
        }

        // teardown cancels pending broker requests and drops the outbox
        let session_id = session.id.clone();
        drop(session);
        let _ = self.dispatcher.sessions().destroy(&session_id);
        drop(tx);
        let _ = writer.await;

        Ok(())
    }
}
