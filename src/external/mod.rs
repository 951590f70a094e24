pub mod cache;
pub mod tmdb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cache::CachedCatalog;
pub use tmdb::TmdbCatalog;

use crate::services::debounce::AbortSignal;
use crate::services::error::CatalogError;
use crate::services::query_builder::CatalogRequest;

/// 目录 API 返回的一页结果
///
/// 条目内容不做解析，原样交给调用方
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

/// 目录查询端点
///
/// 每个请求都绑定一个中止信号，信号中止后返回 `CatalogError::Aborted`
#[async_trait]
pub trait CatalogPort: Send + Sync {
    async fn fetch(
        &self,
        request: &CatalogRequest,
        abort: AbortSignal,
    ) -> Result<CatalogPage, CatalogError>;
}
