//! Fan-out of dashboard messages to WebSocket clients.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::types::DashboardMessage;

/// Cloneable handle on the dashboard broadcast channel.
///
/// Messages are serialized once and shared by every subscriber.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish to all connected clients; returns how many received it.
    pub fn publish(&self, msg: &DashboardMessage) -> usize {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard message");
                return 0;
            }
        };

        match self.tx.send(json) {
            Ok(n) => {
                trace!(receivers = n, "Broadcast sent");
                n
            }
            Err(_) => {
                // No receivers - normal when no clients are connected
                trace!("No WebSocket receivers connected");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let broadcaster = Broadcaster::new(16);
        let mut rx = broadcaster.subscribe();

        let sent = broadcaster.publish(&DashboardMessage::feed_update(json!({"a": 1})));
        assert_eq!(sent, 1);

        let text = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["payload"]["a"], 1);
    }

    #[test]
    fn test_publish_without_receivers() {
        let broadcaster = Broadcaster::new(4);
        assert_eq!(broadcaster.receiver_count(), 0);
        assert_eq!(broadcaster.publish(&DashboardMessage::stats_refreshed(0)), 0);
    }
}
