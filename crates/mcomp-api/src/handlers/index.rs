//! Upload page.

use axum::extract::State;
use axum::response::Html;

use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../assets/index.html");

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state))
}

fn render_index(state: &AppState) -> String {
    let status = |ok: bool| if ok { "available" } else { "unavailable" };
    let caps = &state.capabilities;
    let max_upload_mb = state.config.max_upload_size_mb.to_string();
    INDEX_TEMPLATE
        .replace("{{ffmpeg_status}}", status(caps.ffmpeg_available))
        .replace("{{heic_status}}", status(caps.heic_support))
        .replace("{{max_upload_mb}}", &max_upload_mb)
}
