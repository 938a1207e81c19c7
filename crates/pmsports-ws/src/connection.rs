//! Feed connection manager.
//!
//! Handles connection lifecycle, subscription replay after (re)connect,
//! reconnection with bounded exponential backoff, and cancellation.
//!
//! One connection task owns the socket. Callers talk to it through a command
//! channel; the subscription set, connection state and reconnect counter are
//! shared behind `parking_lot` locks so `add_market` can race a reconnect.

use crate::backoff::ReconnectPolicy;
use crate::error::{WsError, WsResult};
use crate::listener::Listeners;
use crate::message::{parse_update, SubscribeRequest, UpdateEvent};
use crate::subscription::SubscriptionSet;
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Public market channel endpoint.
pub const DEFAULT_FEED_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

/// Feed client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// WebSocket URL.
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: entered through `close()`, never left.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands for the connection task.
#[derive(Debug)]
enum FeedCommand {
    /// Send a subscribe request for every market in the set.
    Resubscribe,
}

struct Inner {
    config: FeedConfig,
    state: RwLock<ConnectionState>,
    subscriptions: SubscriptionSet,
    policy: Mutex<ReconnectPolicy>,
    listeners: Listeners,
    command_tx: mpsc::UnboundedSender<FeedCommand>,
    command_rx: TokioMutex<mpsc::UnboundedReceiver<FeedCommand>>,
    shutdown_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Streaming feed client.
///
/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::new(
            config.reconnect_base_delay_ms,
            config.reconnect_max_delay_ms,
            config.max_reconnect_attempts,
        );

        Self {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                subscriptions: SubscriptionSet::new(),
                policy: Mutex::new(policy),
                listeners: Listeners::new(),
                command_tx,
                command_rx: TokioMutex::new(command_rx),
                shutdown_token: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Reconnect attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.policy.lock().attempts()
    }

    /// Subscribed market identifiers in subscription order.
    pub fn markets(&self) -> Vec<String> {
        self.inner.subscriptions.snapshot()
    }

    /// Whether the connection task is alive (connected, connecting or backing off).
    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Register an update listener.
    pub fn on_update<F>(&self, listener: F)
    where
        F: Fn(&UpdateEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.on_update(listener);
    }

    /// Register a connection state listener.
    pub fn on_state_change<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.inner.listeners.on_state_change(listener);
    }

    /// Start the connection task.
    ///
    /// No-op while a connection task is already alive or after `close()`.
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        if self.state() == ConnectionState::Closed {
            debug!("Feed client closed, ignoring connect");
            return;
        }

        let mut task = self.inner.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Feed connection task already running, ignoring connect");
            return;
        }

        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move { inner.run().await }));
    }

    /// Add a market to the subscription set.
    ///
    /// When connected, the full set is resubscribed right away.
    pub fn add_market(&self, market: impl Into<String>) {
        let market = market.into();
        if self.inner.subscriptions.insert(market.clone()) {
            debug!(%market, "Market added to subscription set");
        }
        self.request_resubscribe();
    }

    /// Add several markets, resubscribing at most once.
    ///
    /// Returns how many identifiers were new.
    pub fn add_markets<I, S>(&self, markets: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added = self.inner.subscriptions.extend(markets);
        if added > 0 {
            debug!(added, total = self.inner.subscriptions.len(), "Markets added");
            self.request_resubscribe();
        }
        added
    }

    fn request_resubscribe(&self) {
        if self.state() == ConnectionState::Connected
            && self.inner.command_tx.send(FeedCommand::Resubscribe).is_err()
        {
            warn!("Feed command channel closed");
        }
    }

    /// Close the client.
    ///
    /// Cancels the connection task and any pending reconnect and moves to the
    /// terminal `Closed` state.
    pub fn close(&self) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        info!("Feed client close requested");
        self.inner.shutdown_token.cancel();
        self.inner.set_state(ConnectionState::Closed);
    }

    /// Close the client and wait for the connection task to finish.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Feed connection task ended abnormally");
            }
        }
    }
}

impl fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("markets", &self.inner.subscriptions.len())
            .finish()
    }
}

impl Inner {
    fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Change state and notify listeners. `Closed` is never left.
    fn set_state(&self, new_state: ConnectionState) {
        {
            let mut state = self.state.write();
            if *state == new_state || *state == ConnectionState::Closed {
                return;
            }
            *state = new_state;
        }
        debug!(state = %new_state, "Feed state changed");
        self.listeners.emit_state(new_state);
    }

    async fn run(self: Arc<Self>) {
        let mut commands = self.command_rx.lock().await;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting feed loop");
                return;
            }

            self.set_state(ConnectionState::Connecting);

            match self.run_connection(&mut commands).await {
                Ok(()) => info!("Feed connection closed"),
                Err(e) => error!(error = %e, "Feed connection error"),
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return;
            }

            self.set_state(ConnectionState::Disconnected);

            let next = self.policy.lock().next_delay();
            let Some(delay) = next else {
                error!(
                    attempts = self.policy.lock().attempts(),
                    "Max reconnection attempts reached, giving up"
                );
                return;
            };

            warn!(
                attempt = self.policy.lock().attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return;
                }
            }
        }
    }

    async fn run_connection(
        &self,
        commands: &mut mpsc::UnboundedReceiver<FeedCommand>,
    ) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to feed");

        let connect = connect_async_tls_with_config(self.config.url.as_str(), None, true, None);
        let (ws_stream, _response) = tokio::select! {
            result = connect => result.map_err(|e| WsError::ConnectionFailed(e.to_string()))?,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let (mut write, mut read) = ws_stream.split();

        self.policy.lock().reset();
        self.set_state(ConnectionState::Connected);
        info!("Feed connected");

        // Anything queued while disconnected is covered by the full replay below
        while commands.try_recv().is_ok() {}
        self.send_subscriptions(&mut write).await?;

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_payload(&text),
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => self.handle_payload(text),
                            Err(e) => warn!(error = %e, "Feed binary frame is not UTF-8, dropped"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write
                                .send(Message::Pong(data))
                                .await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            return Err(WsError::ConnectionClosed {
                                code: 1006,
                                reason: "Stream ended".to_string(),
                            });
                        }
                        _ => {}
                    }
                }

                Some(command) = commands.recv() => {
                    match command {
                        FeedCommand::Resubscribe => self.send_subscriptions(&mut write).await?,
                    }
                }
            }
        }
    }

    /// Send one subscribe request per market in the set.
    async fn send_subscriptions<S>(&self, write: &mut S) -> WsResult<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: fmt::Display,
    {
        let markets = self.subscriptions.snapshot();
        if markets.is_empty() {
            debug!("No markets to subscribe");
            return Ok(());
        }

        for market in &markets {
            let request = SubscribeRequest::market(market.as_str()).to_json()?;
            write
                .send(Message::Text(request))
                .await
                .map_err(|e| WsError::SendFailed(e.to_string()))?;
        }

        info!(count = markets.len(), "Market subscriptions sent");
        Ok(())
    }

    fn handle_payload(&self, text: &str) {
        match parse_update(text) {
            Ok(event) => self.listeners.emit_update(&event),
            Err(e) => warn!(error = %e, "Feed message parse error"),
        }
    }
}
