//! HTTP server implementation using axum.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use pmsports_aggregator::StatsCache;
use pmsports_core::{MarketFilter, Sport};
use pmsports_telemetry::{gather_text, Metrics};
use pmsports_ws::FeedClient;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::DashboardConfig;
use crate::error::DashboardResult;
use crate::types::HealthResponse;

/// Number of markets returned by `/markets/top/volume`.
const TOP_VOLUME_LIMIT: usize = 10;

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve a slot; the slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                Metrics::dashboard_ws_clients(current + 1);
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let previous = self.limiter.current.fetch_sub(1, Ordering::Release);
        Metrics::dashboard_ws_clients(previous.saturating_sub(1));
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<StatsCache>,
    broadcaster: Broadcaster,
    feed: Option<FeedClient>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        cache: Arc<StatsCache>,
        broadcaster: Broadcaster,
        feed: Option<FeedClient>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            cache,
            broadcaster,
            feed,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/app.js", get(serve_script))
        .route("/styles.css", get(serve_styles))
        .route("/stats", get(get_stats))
        .route("/markets", get(get_filtered_markets))
        .route("/markets/top/volume", get(get_top_volume))
        .route("/markets/{sport}", get(get_sport_markets))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn serve_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("../static/app.js"),
    )
}

async fn serve_styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_str!("../static/styles.css"),
    )
}

/// Cached stats, refreshed when stale.
async fn get_stats(State(state): State<AppState>) -> DashboardResult<Response> {
    let stats = state.cache.get_or_refresh().await?;
    Ok(Json(&*stats).into_response())
}

/// Markets for one league; unknown leagues give an empty list.
async fn get_sport_markets(
    State(state): State<AppState>,
    Path(sport): Path<String>,
) -> DashboardResult<Response> {
    let sport = match sport.parse::<Sport>() {
        Ok(sport) => sport,
        Err(_) => {
            debug!(sport = %sport, "Unknown sport requested");
            return Ok(Json(Vec::<()>::new()).into_response());
        }
    };

    let stats = state.cache.get_or_refresh().await?;
    Ok(Json(stats.by_sport(sport)).into_response())
}

async fn get_top_volume(State(state): State<AppState>) -> DashboardResult<Response> {
    let stats = state.cache.get_or_refresh().await?;
    Ok(Json(stats.top_by_volume(TOP_VOLUME_LIMIT)).into_response())
}

async fn get_filtered_markets(
    State(state): State<AppState>,
    Query(filter): Query<MarketFilter>,
) -> DashboardResult<Response> {
    let stats = state.cache.get_or_refresh().await?;
    Ok(Json(filter.apply(&stats.markets, Utc::now())).into_response())
}

/// Health never triggers a refresh.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let latest = state.cache.latest();
    let feed = state
        .feed
        .as_ref()
        .map(|feed| feed.state().as_str().to_string())
        .unwrap_or_else(|| "disabled".to_string());

    Json(HealthResponse {
        status: "healthy",
        last_update: latest.as_ref().map(|s| s.last_updated),
        market_count: latest.as_ref().map(|s| s.sports_market_count).unwrap_or(0),
        feed,
    })
}

async fn get_metrics() -> DashboardResult<Response> {
    let text = gather_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Forward broadcast messages to one client until either side closes.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcaster.subscribe();

    // Incoming side only watches for close; axum answers pings itself
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Run the dashboard HTTP server until `shutdown` resolves.
pub async fn run_server<F>(state: AppState, port: u16, shutdown: F) -> DashboardResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Dashboard server shut down");
    Ok(())
}
