//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::download::{download_all, download_file};
use crate::handlers::jobs::{clear_jobs, delete_job, get_job, list_jobs};
use crate::handlers::thumbnail::get_thumbnail;
use crate::handlers::upload::upload_file;
use crate::handlers::{health, index};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    content_length_limit, cors_layer, rate_limit_middleware, request_id, request_logging,
    security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let app_routes = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_file))
        .route("/job/:job_id", get(get_job).delete(delete_job))
        .route("/jobs", get(list_jobs).delete(clear_jobs))
        .route("/download/:job_id", get(download_file))
        .route("/download-all", get(download_all))
        .route("/thumbnail/:job_id", get(get_thumbnail))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    let metrics_routes = match metrics_handle {
        Some(handle) => {
            let render = move || async move { handle.render() };
            Router::new().route("/metrics", get(render))
        }
        None => Router::new(),
    };

    Router::new()
        .merge(app_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads are streamed, so the only cap is the body limit below.
        // Declared lengths over it are refused up front with a JSON error.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes()))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            content_length_limit,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
