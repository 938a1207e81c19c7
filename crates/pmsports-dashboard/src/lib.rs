//! pmsports-dashboard - Stats API and dashboard UI.
//!
//! Serves the cached sports market stats over HTTP, pushes feed updates to
//! browsers over WebSocket, and ships the static dashboard page.
//!
//! # Routes
//!
//! ```text
//! GET /                     dashboard HTML (+ /app.js, /styles.css)
//! GET /stats                cached MarketStats, refreshed when stale
//! GET /markets?status=&end_days=
//! GET /markets/{sport}      NBA / NFL / MLB / NHL
//! GET /markets/top/volume   top 10 by 24h volume
//! GET /health               status, last update, market count, feed state
//! GET /metrics              Prometheus text format
//! GET /ws                   live feed updates
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pmsports_dashboard::{run_server, AppState, Broadcaster, DashboardConfig};
//!
//! let broadcaster = Broadcaster::new(256);
//! let state = AppState::new(cache, broadcaster.clone(), Some(feed.clone()), config.clone());
//! tokio::spawn(run_server(state, config.port, shutdown.cancelled_owned()));
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod types;

pub use broadcast::Broadcaster;
pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, AppState, ConnectionLimiter};
pub use types::{DashboardMessage, HealthResponse};
