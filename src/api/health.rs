use axum::{extract::State, response::IntoResponse};
use serde_json::json;

use super::error::ApiResult;
use super::response::success;
use super::AppState;

/// 健康检查端点
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let tmdb_status = if state.catalog.is_some() {
        "available"
    } else {
        "not_configured"
    };
    let preset_count = state.presets.read().await.len();

    Ok(success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "tmdb_api": tmdb_status,
        "presets": preset_count,
    })))
}
