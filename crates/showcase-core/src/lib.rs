//! # showcase-core
//!
//! Session-scoped core for the mcp-showcase server:
//! - Session registry with server-generated ids and teardown cleanup
//! - Opaque pagination cursors over ordered collections
//! - Prefix-match argument completion over fixed vocabularies
//! - Subscription and diagnostic-log tickers tied to the server lifecycle
//! - Bidirectional request broker for elicitation and sampling round trips

pub mod broker;
pub mod completion;
pub mod cursor;
pub mod error;
pub mod logging;
pub mod session;
pub mod ticker;

pub use broker::{BrokerReply, RequestBroker};
pub use completion::{Completion, CompletionEngine, CompletionReference};
pub use cursor::Page;
pub use error::{CoreError, Result};
pub use logging::LogLevel;
pub use session::{Outbox, Session, SessionRegistry};
pub use ticker::{TickerConfig, Tickers};
