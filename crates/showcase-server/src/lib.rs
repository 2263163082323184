//! # showcase-server
//!
//! MCP (Model Context Protocol) server for mcp-showcase: session-scoped
//! dispatch over streamable HTTP/SSE and stdio transports, with demo tools,
//! resources, and prompts exercising pagination, subscriptions, logging,
//! completion, elicitation, and sampling.

pub mod capability;
pub mod protocol;
pub mod registry;
pub mod schema;
mod server;
pub mod transport;

pub use protocol::{Dispatcher, McpError, McpMessage, ServerCapabilities};
pub use registry::{HandlerContext, PromptRegistry, ResourceRegistry, ToolRegistry};
pub use server::{McpServer, ServerMode};
pub use transport::{HttpTransport, StdioTransport};
