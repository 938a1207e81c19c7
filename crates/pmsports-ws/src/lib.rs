//! Streaming market-data feed client.
//!
//! Keeps one logical WebSocket connection to the market channel with:
//! - A subscription set that is replayed on every (re)connect
//! - Exponential reconnect backoff with a bounded attempt count
//! - Observer registration for update events and connection state changes
//! - Explicit `close()` that cancels any pending reconnect

pub mod backoff;
pub mod connection;
pub mod error;
pub mod listener;
pub mod message;
pub mod subscription;

pub use backoff::ReconnectPolicy;
pub use connection::{ConnectionState, FeedClient, FeedConfig, DEFAULT_FEED_URL};
pub use error::{WsError, WsResult};
pub use listener::{Listeners, StateListener, UpdateListener};
pub use message::{parse_update, SubscribeRequest, UpdateEvent};
pub use subscription::SubscriptionSet;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any TLS connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
