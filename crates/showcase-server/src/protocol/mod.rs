//! MCP protocol types and dispatch

mod capabilities;
mod dispatcher;
mod types;

pub use capabilities::ServerCapabilities;
pub use dispatcher::Dispatcher;
pub use types::*;
