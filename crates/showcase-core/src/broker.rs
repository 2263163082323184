//! Bidirectional request broker
//!
//! Lets a capability handler send a request *to* the client (elicitation,
//! sampling) and suspend until the correlated reply arrives, without holding
//! up other sessions. Each outbound request gets a fresh correlation id and
//! a pending-table entry holding a oneshot resolver; the transport routes
//! inbound reply envelopes back here by id.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::session::Session;

/// Upper bound on outstanding requests per session. A client that never
/// replies ties up at most this many handler continuations before further
/// nested requests fail fast.
const MAX_PENDING_PER_SESSION: usize = 32;

/// Outcome of a broker round trip. A client-side decline or cancel arrives
/// as a normal `Result` payload; `Cancelled` here means the owning session
/// went away before any reply did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerReply {
    Result(Value),
    Error { code: i64, message: String },
    Cancelled,
}

struct PendingRequest {
    session_id: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    resolver: oneshot::Sender<BrokerReply>,
}

/// Table of in-flight server-to-client requests, keyed by correlation id
pub struct RequestBroker {
    pending: Mutex<HashMap<String, PendingRequest>>,
}

impl RequestBroker {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Send a request toward the client owning `session` and suspend until a
    /// correlated reply arrives or the session is destroyed.
    pub async fn send(&self, session: &Session, method: &str, params: Value) -> Result<BrokerReply> {
        let id = uuid::Uuid::new_v4().to_string();
        let (resolver, reply) = oneshot::channel();

        {
            let mut pending = self.pending.lock().unwrap();
            let in_flight = pending
                .values()
                .filter(|entry| entry.session_id == session.id)
                .count();
            if in_flight >= MAX_PENDING_PER_SESSION {
                return Err(CoreError::BrokerBusy(session.id.clone()));
            }
            pending.insert(
                id.clone(),
                PendingRequest {
                    session_id: session.id.clone(),
                    created_at: Utc::now(),
                    resolver,
                },
            );
        }

        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        if let Err(err) = session.send(envelope) {
            self.pending.lock().unwrap().remove(&id);
            return Err(err);
        }

        debug!("Sent {} request {} to session {}", method, id, session.id);

        // The resolver is dropped only if the broker itself is torn down
        // mid-flight; treat that the same as a session cancellation.
        Ok(reply.await.unwrap_or(BrokerReply::Cancelled))
    }

    /// Resolve a pending request by correlation id. Returns false for an
    /// unknown id, which callers log and discard.
    pub fn resolve(&self, id: &str, reply: BrokerReply) -> bool {
        match self.pending.lock().unwrap().remove(id) {
            Some(entry) => {
                debug!("Resolved client request {}", id);
                // receiver may have been dropped with its handler task
                let _ = entry.resolver.send(reply);
                true
            }
            None => {
                warn!("Discarding reply with unknown correlation id {}", id);
                false
            }
        }
    }

    /// Resolve every pending request owned by a session with a cancellation
    /// outcome. Called on session destruction so no handler hangs forever.
    pub fn cancel_session(&self, session_id: &str) {
        let drained: Vec<PendingRequest> = {
            let mut pending = self.pending.lock().unwrap();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, entry)| entry.session_id == session_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id))
                .collect()
        };

        if !drained.is_empty() {
            debug!(
                "Cancelled {} pending client requests for session {}",
                drained.len(),
                session_id
            );
        }
        for entry in drained {
            let _ = entry.resolver.send(BrokerReply::Cancelled);
        }
    }

    /// Number of in-flight requests for one session
    pub fn pending_for(&self, session_id: &str) -> usize {
        self.pending
            .lock()
            .unwrap()
            .values()
            .filter(|entry| entry.session_id == session_id)
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Default for RequestBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRegistry;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn setup() -> (
        Arc<RequestBroker>,
        Arc<SessionRegistry>,
        Arc<Session>,
        mpsc::UnboundedReceiver<Value>,
    ) {
        let broker = Arc::new(RequestBroker::new());
        let registry = Arc::new(SessionRegistry::new(broker.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        let session = registry.create(tx);
        (broker, registry, session, rx)
    }

    #[tokio::test]
    async fn test_round_trip_resolves_exactly_once() {
        let (broker, _registry, session, mut rx) = setup();

        let task = {
            let broker = broker.clone();
            let session = session.clone();
            tokio::spawn(async move {
                broker
                    .send(&session, "elicitation/create", json!({"message": "hi"}))
                    .await
            })
        };

        // The outbound envelope carries the fresh correlation id
        let envelope = rx.recv().await.unwrap();
        let id = envelope["id"].as_str().unwrap().to_string();
        assert_eq!(envelope["method"], "elicitation/create");
        assert_eq!(broker.pending_count(), 1);

        assert!(broker.resolve(&id, BrokerReply::Result(json!({"action": "accept"}))));
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply, BrokerReply::Result(json!({"action": "accept"})));

        // pending entry removed; second resolve finds nothing
        assert_eq!(broker.pending_count(), 0);
        assert!(!broker.resolve(&id, BrokerReply::Cancelled));
    }

    #[tokio::test]
    async fn test_unknown_reply_id_is_discarded() {
        let (broker, _registry, _session, _rx) = setup();
        assert!(!broker.resolve("no-such-id", BrokerReply::Result(json!({}))));
    }

    #[tokio::test]
    async fn test_session_destroy_cancels_pending() {
        let (broker, registry, session, mut rx) = setup();

        let task = {
            let broker = broker.clone();
            let session = session.clone();
            tokio::spawn(async move {
                broker
                    .send(&session, "sampling/createMessage", json!({}))
                    .await
            })
        };

        // wait until the request is actually in flight
        let _ = rx.recv().await.unwrap();
        assert_eq!(broker.pending_for(&session.id), 1);

        registry.destroy(&session.id).unwrap();

        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply, BrokerReply::Cancelled);
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_only_touches_owning_session() {
        let (broker, registry, a, mut rx_a) = setup();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let b = registry.create(tx_b);

        let task_a = {
            let broker = broker.clone();
            let a = a.clone();
            tokio::spawn(async move { broker.send(&a, "elicitation/create", json!({})).await })
        };
        let task_b = {
            let broker = broker.clone();
            let b = b.clone();
            tokio::spawn(async move { broker.send(&b, "elicitation/create", json!({})).await })
        };

        let _ = rx_a.recv().await.unwrap();
        let envelope_b = rx_b.recv().await.unwrap();
        let id_b = envelope_b["id"].as_str().unwrap().to_string();

        registry.destroy(&a.id).unwrap();

        assert_eq!(task_a.await.unwrap().unwrap(), BrokerReply::Cancelled);
        // session b is untouched and still resolvable
        assert_eq!(broker.pending_for(&b.id), 1);
        broker.resolve(&id_b, BrokerReply::Result(json!({"ok": true})));
        assert_eq!(
            task_b.await.unwrap().unwrap(),
            BrokerReply::Result(json!({"ok": true}))
        );
    }

    #[tokio::test]
    async fn test_pending_table_is_bounded_per_session() {
        let (broker, _registry, session, _rx) = setup();

        let mut tasks = Vec::new();
        for _ in 0..MAX_PENDING_PER_SESSION {
            let broker = broker.clone();
            let session = session.clone();
            tasks.push(tokio::spawn(async move {
                broker.send(&session, "elicitation/create", json!({})).await
            }));
        }

        // let every send reach its suspension point
        tokio::task::yield_now().await;
        while broker.pending_for(&session.id) < MAX_PENDING_PER_SESSION {
            tokio::task::yield_now().await;
        }

        let err = broker
            .send(&session, "elicitation/create", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BrokerBusy(_)));

        broker.cancel_session(&session.id);
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), BrokerReply::Cancelled);
        }
    }

    #[tokio::test]
    async fn test_send_to_closed_outbox_fails_and_leaves_no_entry() {
        let (broker, _registry, session, rx) = setup();
        drop(rx);

        let err = broker
            .send(&session, "elicitation/create", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OutboxClosed(_)));
        assert_eq!(broker.pending_count(), 0);
    }
}
