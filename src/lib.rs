//! blog-service
//!
//! A blogging service: users publish posts, file them under groups, comment
//! on each other's posts and follow authors to build a personal feed.

pub mod app_state;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod views;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};

/// Initialize logging subsystem with environment-based configuration
///
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
