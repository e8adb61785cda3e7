//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ffmpeg_available: bool,
    pub heic_support: bool,
    pub version: String,
    pub timestamp: String,
}

/// Liveness check. Capabilities are the ones detected at startup.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        ffmpeg_available: state.capabilities.ffmpeg_available,
        heic_support: state.capabilities.heic_support,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
