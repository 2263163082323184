//! Per-connection session state and the session registry
//!
//! A session is created when an initialization request arrives without a
//! session id, and destroyed when its transport closes. Ids are generated
//! here, never by the client, so they are unique for the server's lifetime.
//!
//! Session fields sit behind synchronous locks on purpose: every mutation
//! completes without a suspension point, so checks like "does the session
//! exist" and the mutation they guard can never straddle an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

use crate::broker::RequestBroker;
use crate::error::{CoreError, Result};
use crate::logging::LogLevel;

/// Server-to-client delivery channel for one session. Carries fully formed
/// envelopes: notifications and broker-initiated requests.
pub type Outbox = mpsc::UnboundedSender<Value>;

/// State for one logical client connection
#[derive(Debug)]
pub struct Session {
    /// Opaque server-generated id
    pub id: String,
    pub created_at: DateTime<Utc>,
    initialized: RwLock<bool>,
    log_level: RwLock<LogLevel>,
    subscriptions: RwLock<HashSet<String>>,
    outbox: Outbox,
}

impl Session {
    fn new(id: String, outbox: Outbox) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            initialized: RwLock::new(false),
            log_level: RwLock::new(LogLevel::default()),
            subscriptions: RwLock::new(HashSet::new()),
            outbox,
        }
    }

    /// Mark the session active after the initialization handshake
    pub fn mark_initialized(&self) {
        *self.initialized.write().unwrap() = true;
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.read().unwrap()
    }

    pub fn set_log_level(&self, level: LogLevel) {
        *self.log_level.write().unwrap() = level;
    }

    pub fn log_level(&self) -> LogLevel {
        *self.log_level.read().unwrap()
    }

    /// Register interest in change notifications for a resource URI.
    /// Subscribing twice is a no-op.
    pub fn subscribe(&self, uri: impl Into<String>) {
        self.subscriptions.write().unwrap().insert(uri.into());
    }

    /// Remove interest in a resource URI. Unsubscribing from a URI that was
    /// never subscribed is a no-op, not an error.
    pub fn unsubscribe(&self, uri: &str) {
        self.subscriptions.write().unwrap().remove(uri);
    }

    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.subscriptions.read().unwrap().contains(uri)
    }

    /// Snapshot of the current subscription set
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.read().unwrap().iter().cloned().collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().unwrap().len()
    }

    /// Push an envelope onto the session's outbound channel
    pub fn send(&self, envelope: Value) -> Result<()> {
        self.outbox
            .send(envelope)
            .map_err(|_| CoreError::OutboxClosed(self.id.clone()))
    }
}

/// Registry owning all live sessions, keyed by session id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    broker: Arc<RequestBroker>,
}

impl SessionRegistry {
    pub fn new(broker: Arc<RequestBroker>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            broker,
        }
    }

    /// Create a session with a fresh id and the given outbound channel
    pub fn create(&self, outbox: Outbox) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone(), outbox));

        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), session.clone());

        info!("Created session {}", id);
        session
    }

    /// Look up a live session
    pub fn resolve(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().unwrap().contains_key(id)
    }

    /// Tear down a session: drop it from the registry and resolve any of its
    /// outstanding broker requests with a cancellation outcome. Subscription
    /// deliveries stop with the next tick, which no longer sees the session.
    pub fn destroy(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .unwrap()
            .remove(id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;

        self.broker.cancel_session(&session.id);

        info!(
            "Destroyed session {} ({} subscriptions dropped)",
            id,
            session.subscription_count()
        );
        Ok(())
    }

    /// Snapshot of all live sessions, for the background tickers
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    pub fn broker(&self) -> &Arc<RequestBroker> {
        &self.broker
    }
}
