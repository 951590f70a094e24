use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::response::{success, success_message, ApiResponse};
use super::AppState;
use crate::models::{ContentType, FilterState, NewPreset, PresetUpdate};
use crate::services::url_sync::UrlCodec;

#[derive(Debug, Deserialize)]
pub struct ListPresetsQuery {
    /// 只返回使用次数最多的 n 个
    pub most_used: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePresetRequest {
    #[serde(flatten)]
    pub preset: NewPreset,
    /// 名称已存在时拒绝保存
    #[serde(default)]
    pub reject_duplicates: bool,
}

#[derive(Debug, Serialize)]
pub struct LoadedPreset {
    pub filters: FilterState,
    pub filters_query: String,
}

/// 获取预设列表
pub async fn list_presets(
    State(state): State<AppState>,
    Query(query): Query<ListPresetsQuery>,
) -> ApiResult<impl IntoResponse> {
    let library = state.presets.read().await;
    let presets = match query.most_used {
        Some(n) => library.most_used(n),
        None => library.presets(),
    };
    Ok(success(presets))
}

/// 保存新预设
pub async fn create_preset(
    State(state): State<AppState>,
    Json(request): Json<CreatePresetRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut library = state.presets.write().await;

    if request.reject_duplicates && library.preset_name_exists(&request.preset.name) {
        return Err(ApiError::Conflict(format!(
            "Preset name already exists: {}",
            request.preset.name.trim()
        )));
    }

    let saved = library.save_preset(request.preset).await?;
    match saved {
        Some(preset) => Ok(ApiResponse::success_with_message(preset, "Preset saved")),
        None => Err(ApiError::Validation(format!(
            "Preset limit reached ({})",
            library.max_presets()
        ))),
    }
}

/// 修改预设
pub async fn update_preset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PresetUpdate>,
) -> ApiResult<impl IntoResponse> {
    let mut library = state.presets.write().await;
    let updated = library
        .update_preset(&id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Preset {} not found", id)))?;
    Ok(success(updated))
}

/// 删除预设
pub async fn delete_preset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mut library = state.presets.write().await;
    if !library.delete_preset(&id).await? {
        return Err(ApiError::NotFound(format!("Preset {} not found", id)));
    }
    Ok(success_message("Preset deleted"))
}

/// 载入预设，返回筛选条件和对应的 URL 查询串
pub async fn load_preset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mut library = state.presets.write().await;
    let filters = library
        .load_preset(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Preset {} not found", id)))?;

    let filters_query = UrlCodec::new(ContentType::Movie).serialize(&filters);
    Ok(success(LoadedPreset {
        filters,
        filters_query,
    }))
}
