//! Transport implementations for the MCP server

mod http;
mod stdio;

pub use http::{HttpTransport, SESSION_HEADER};
pub use stdio::StdioTransport;
