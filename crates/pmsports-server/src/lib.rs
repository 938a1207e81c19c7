//! Sports prediction-market stats service.
//!
//! Wires the components together:
//! - Periodic REST poll feeding the stats cache
//! - Feed client subscribed to every polled sports market
//! - Dashboard server with live push of feed updates

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, FeedSection};
pub use error::{AppError, AppResult};
