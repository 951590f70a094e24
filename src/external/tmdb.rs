// TMDB 目录客户端
//
// 按构建好的目录请求调用 TMDB v3 API，请求与中止信号竞争，先中止则立即返回

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{CatalogPage, CatalogPort};
use crate::services::debounce::AbortSignal;
use crate::services::error::CatalogError;
use crate::services::query_builder::CatalogRequest;

/// TMDB API客户端
#[derive(Clone)]
pub struct TmdbCatalog {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbCatalog {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.themoviedb.org/3";

    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client, using defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            language: "en-US".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// 请求地址（不含查询串）
    pub fn endpoint_url(&self, request: &CatalogRequest) -> String {
        format!("{}/{}", self.base_url, request.endpoint.path())
    }

    async fn send(&self, request: &CatalogRequest) -> Result<CatalogPage, CatalogError> {
        let url = self.endpoint_url(request);
        let mut query: Vec<(&str, &str)> = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        query.extend(request.params.iter());

        let response = self.client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::Http(response.status().as_u16()));
        }

        let page: CatalogPage = response.json().await?;
        tracing::debug!(
            "TMDB {} returned page {} of {}",
            request.endpoint.path(),
            page.page,
            page.total_pages
        );
        Ok(page)
    }
}

#[async_trait]
impl CatalogPort for TmdbCatalog {
    async fn fetch(
        &self,
        request: &CatalogRequest,
        abort: AbortSignal,
    ) -> Result<CatalogPage, CatalogError> {
        tokio::select! {
            biased;
            _ = abort.aborted() => {
                tracing::debug!("Catalog request aborted: {}", request.cache_key());
                Err(CatalogError::Aborted)
            }
            result = self.send(request) => result,
        }
    }
}
