//! Background tickers owned by the server lifecycle
//!
//! Two periodic loops run independently of any request/response cycle: one
//! emits `notifications/resources/updated` for every subscribed URI, one
//! emits a demo `notifications/message` at a random level to every session
//! whose threshold admits it. Delivery is fire-and-forget: a closed session
//! is skipped, never allowed to stall the loop. Both loops stop cleanly on
//! shutdown so no timer outlives the server.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::logging::DEMO_MESSAGES;
use crate::session::SessionRegistry;

/// Intervals for the background loops
#[derive(Debug, Clone, Copy)]
pub struct TickerConfig {
    /// Cadence of `notifications/resources/updated` per subscribed URI
    pub resource_interval: Duration,
    /// Cadence of the demo log message notification
    pub log_interval: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            resource_interval: Duration::from_secs(10),
            log_interval: Duration::from_secs(20),
        }
    }
}

/// Handle to the running background loops
pub struct Tickers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Tickers {
    /// Start both loops. Runs until [`Tickers::stop`] is called.
    pub fn start(registry: Arc<SessionRegistry>, config: TickerConfig) -> Self {
        let (shutdown, rx) = watch::channel(false);

        let handles = vec![
            tokio::spawn(resource_update_loop(
                registry.clone(),
                config.resource_interval,
                rx.clone(),
            )),
            tokio::spawn(log_message_loop(registry, config.log_interval, rx)),
        ];

        info!(
            "Started background tickers (resources every {:?}, logs every {:?})",
            config.resource_interval, config.log_interval
        );
        Self { shutdown, handles }
    }

    /// Stop both loops and wait for them to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("Stopped background tickers");
    }
}

/// One `notifications/resources/updated` per subscribed URI per tick, to the
/// owning session only.
async fn resource_update_loop(
    registry: Arc<SessionRegistry>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                for session in registry.sessions() {
                    for uri in session.subscriptions() {
                        let note = json!({
                            "jsonrpc": "2.0",
                            "method": "notifications/resources/updated",
                            "params": { "uri": uri },
                        });
                        if session.send(note).is_err() {
                            debug!("Skipping update delivery to closed session {}", session.id);
                            break;
                        }
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// A demo log message at a random level, delivered to each session whose
/// threshold admits it.
async fn log_message_loop(
    registry: Arc<SessionRegistry>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let (level, text) = DEMO_MESSAGES[rand::thread_rng().gen_range(0..DEMO_MESSAGES.len())];
                for session in registry.sessions() {
                    if !session.log_level().admits(level) {
                        continue;
                    }
                    let note = json!({
                        "jsonrpc": "2.0",
                        "method": "notifications/message",
                        "params": {
                            "level": level.as_str(),
                            "logger": "mcp-showcase",
                            "data": text,
                        },
                    });
                    if session.send(note).is_err() {
                        debug!("Skipping log delivery to closed session {}", session.id);
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::RequestBroker;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(Arc::new(RequestBroker::new())))
    }

    async fn recv_method(
        rx: &mut mpsc::UnboundedReceiver<Value>,
        method: &str,
    ) -> Value {
        loop {
            let envelope = rx.recv().await.expect("outbox closed");
            if envelope["method"] == method {
                return envelope;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribed_uri_gets_update_per_tick() {
        let registry = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = registry.create(tx);
        session.subscribe("demo://static/resource/3");

        let tickers = Tickers::start(
            registry.clone(),
            TickerConfig {
                resource_interval: Duration::from_secs(10),
                log_interval: Duration::from_secs(3600),
            },
        );

        let note = recv_method(&mut rx, "notifications/resources/updated").await;
        assert_eq!(note["params"]["uri"], "demo://static/resource/3");

        tickers.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribed_session_gets_nothing() {
        let registry = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = registry.create(tx);

        let tickers = Tickers::start(
            registry.clone(),
            TickerConfig {
                resource_interval: Duration::from_secs(1),
                log_interval: Duration::from_secs(3600),
            },
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        tickers.stop().await;

        while let Ok(envelope) = rx.try_recv() {
            assert_ne!(envelope["method"], "notifications/resources/updated");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_does_not_stall_others() {
        let registry = registry();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let dead = registry.create(tx_dead);
        dead.subscribe("demo://static/resource/1");
        drop(rx_dead);

        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let live = registry.create(tx_live);
        live.subscribe("demo://static/resource/2");

        let tickers = Tickers::start(
            registry.clone(),
            TickerConfig {
                resource_interval: Duration::from_secs(10),
                log_interval: Duration::from_secs(3600),
            },
        );

        let note = recv_method(&mut rx_live, "notifications/resources/updated").await;
        assert_eq!(note["params"]["uri"], "demo://static/resource/2");

        tickers.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_ticker_respects_threshold() {
        let registry = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = registry.create(tx);
        // nothing is above emergency except emergency itself
        session.set_log_level(crate::logging::LogLevel::Emergency);

        let tickers = Tickers::start(
            registry.clone(),
            TickerConfig {
                resource_interval: Duration::from_secs(3600),
                log_interval: Duration::from_secs(5),
            },
        );

        // enough ticks that a random draw below emergency would have leaked
        tokio::time::sleep(Duration::from_secs(60)).await;
        tickers.stop().await;

        while let Ok(envelope) = rx.try_recv() {
            if envelope["method"] == "notifications/message" {
                assert_eq!(envelope["params"]["level"], "emergency");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_no_running_timer() {
        let registry = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = registry.create(tx);
        session.subscribe("demo://static/resource/9");

        let tickers = Tickers::start(
            registry.clone(),
            TickerConfig {
                resource_interval: Duration::from_secs(10),
                log_interval: Duration::from_secs(10),
            },
        );
        tickers.stop().await;
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
