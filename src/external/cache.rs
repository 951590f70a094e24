// 目录响应缓存
//
// 包装任意 CatalogPort，在 TTL 内对相同的规范化请求直接返回缓存结果

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use super::{CatalogPage, CatalogPort};
use crate::services::debounce::AbortSignal;
use crate::services::error::CatalogError;
use crate::services::query_builder::CatalogRequest;

/// 带响应缓存的目录端点
///
/// 以规范化的请求串为键，被中止或失败的请求不会进入缓存
pub struct CachedCatalog<C> {
    inner: C,
    cache: Cache<String, CatalogPage>,
}

impl<C: CatalogPort> CachedCatalog<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl<C: CatalogPort> CatalogPort for CachedCatalog<C> {
    async fn fetch(
        &self,
        request: &CatalogRequest,
        abort: AbortSignal,
    ) -> Result<CatalogPage, CatalogError> {
        if abort.is_aborted() {
            return Err(CatalogError::Aborted);
        }

        let key = request.cache_key();
        if let Some(page) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for catalog request: {}", key);
            return Ok(page);
        }

        let page = self.inner.fetch(request, abort.clone()).await?;
        // 结果返回前信号被中止，说明已经过期
        if abort.is_aborted() {
            return Err(CatalogError::Aborted);
        }
        self.cache.insert(key, page.clone()).await;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{create_default_filters, ContentType};
    use crate::services::query_builder::build_catalog_request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingCatalog {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogPort for CountingCatalog {
        async fn fetch(
            &self,
            _request: &CatalogRequest,
            _abort: AbortSignal,
        ) -> Result<CatalogPage, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogError::Http(503));
            }
            Ok(CatalogPage {
                page: 1,
                results: vec![serde_json::json!({ "id": 550 })],
                total_pages: 1,
                total_results: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_second_request_hits_cache() {
        let inner = CountingCatalog::default();
        let calls = inner.calls.clone();
        let catalog = CachedCatalog::new(inner, Duration::from_secs(60));
        let request = build_catalog_request(&create_default_filters(ContentType::Movie));

        catalog.fetch(&request, AbortSignal::new()).await.unwrap();
        let page = catalog.fetch(&request, AbortSignal::new()).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_and_aborts_are_not_cached() {
        let inner = CountingCatalog {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        };
        let calls = inner.calls.clone();
        let catalog = CachedCatalog::new(inner, Duration::from_secs(60));
        let request = build_catalog_request(&create_default_filters(ContentType::Tv));

        assert!(catalog.fetch(&request, AbortSignal::new()).await.is_err());
        assert!(catalog.fetch(&request, AbortSignal::new()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let aborted = AbortSignal::new();
        aborted.abort();
        let err = catalog.fetch(&request, aborted).await.unwrap_err();
        assert!(err.is_abort());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
