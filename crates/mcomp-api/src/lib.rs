//! Axum HTTP server for the media compressor.
//!
//! This crate provides:
//! - Upload, job status, download and thumbnail endpoints
//! - Background compression bounded by a concurrency limit
//! - Periodic cleanup of expired jobs
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::JobJanitor;
pub use state::AppState;
