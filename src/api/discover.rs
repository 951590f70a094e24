use axum::{
    extract::{RawQuery, State},
    response::IntoResponse,
};
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::response::success;
use super::AppState;
use crate::external::CatalogPage;
use crate::models::{ContentType, FilterState};
use crate::services::debounce::AbortSignal;
use crate::services::query_builder::{build_catalog_request, CatalogRequest, QueryParams};
use crate::services::url_sync::UrlCodec;

/// 解析后的筛选查询
#[derive(Debug, Serialize)]
pub struct FilterQueryResponse {
    /// 规范化后的 URL 查询串
    pub filters_query: String,
    pub has_active_filters: bool,
    pub filters: FilterState,
    pub request: RequestSummary,
}

#[derive(Debug, Serialize)]
pub struct RequestSummary {
    pub endpoint: String,
    pub params: QueryParams,
}

impl From<&CatalogRequest> for RequestSummary {
    fn from(request: &CatalogRequest) -> Self {
        Self {
            endpoint: request.endpoint.path(),
            params: request.params.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    #[serde(flatten)]
    pub query: FilterQueryResponse,
    pub results: CatalogPage,
}

fn resolve(raw: Option<String>) -> (FilterQueryResponse, CatalogRequest) {
    // 没有 type 参数时按电影处理
    let codec = UrlCodec::new(ContentType::Movie);
    let filters = codec.parse(raw.as_deref().unwrap_or_default());
    let request = build_catalog_request(&filters);

    let response = FilterQueryResponse {
        filters_query: codec.serialize(&filters),
        has_active_filters: filters.has_active_filters(),
        request: RequestSummary::from(&request),
        filters,
    };
    (response, request)
}

/// 把 URL 查询串解析为筛选条件和目录参数，不发起请求
pub async fn filters_query(RawQuery(raw): RawQuery) -> ApiResult<impl IntoResponse> {
    let (response, _) = resolve(raw);
    Ok(success(response))
}

/// 按 URL 查询串筛选并请求目录
pub async fn discover(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<impl IntoResponse> {
    let catalog = state.catalog.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("TMDB API key not configured".to_string())
    })?;

    let (query, request) = resolve(raw);
    tracing::debug!("Discover request: {}", request.cache_key());

    let results = catalog.fetch(&request, AbortSignal::new()).await.map_err(|e| {
        tracing::error!("Catalog fetch failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(success(DiscoverResponse { query, results }))
}
