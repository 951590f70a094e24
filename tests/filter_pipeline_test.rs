// 筛选流程集成测试
//
// 覆盖 URL 往返、预设切换、防抖提交和过期请求的中止

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use proptest::prelude::*;

use filter_engine_backend::external::{CatalogPage, CatalogPort};
use filter_engine_backend::models::{create_default_filters, ContentType, FilterField};
use filter_engine_backend::ports::MemoryHistory;
use filter_engine_backend::services::{
    build_catalog_request, AbortSignal, CatalogError, CatalogRequest, FilterSession, FilterStore,
    PresetCatalog, SessionOptions, UrlCodec,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn options() -> SessionOptions {
    SessionOptions {
        content_type: ContentType::Movie,
        debounce: Duration::from_millis(250),
        presets: PresetCatalog::new(today()),
    }
}

/// 等待很久才返回，期间被中止则立即结束
#[derive(Default)]
struct SlowCatalog {
    started: AtomicUsize,
}

#[async_trait]
impl CatalogPort for SlowCatalog {
    async fn fetch(
        &self,
        request: &CatalogRequest,
        abort: AbortSignal,
    ) -> Result<CatalogPage, CatalogError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = abort.aborted() => Err(CatalogError::Aborted),
            _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(CatalogPage {
                page: 1,
                results: vec![serde_json::json!({ "key": request.cache_key() })],
                total_pages: 1,
                total_results: 1,
            }),
        }
    }
}

#[test]
fn test_deep_link_to_catalog_params() {
    let codec = UrlCodec::new(ContentType::Movie);
    let state = codec.parse(
        "type=tv&with_genres=18,9648&without_genres=9648&first_air_date.gte=2020-01-01&with_networks=213",
    );
    let request = build_catalog_request(&state);

    assert_eq!(request.endpoint.path(), "discover/tv");
    // 同时包含和排除时排除优先
    assert_eq!(request.params.get("with_genres"), Some("18"));
    assert_eq!(request.params.get("without_genres"), Some("9648"));
    assert_eq!(request.params.get("first_air_date.gte"), Some("2020-01-01"));
    assert_eq!(request.params.get("with_networks"), Some("213"));
    assert!(!request.params.contains("primary_release_date.gte"));
}

#[test]
fn test_category_switch_keeps_user_narrowing() {
    let mut store = FilterStore::new(ContentType::Movie, PresetCatalog::new(today()));
    store.set_preset("upcoming");
    store.toggle_in_set(FilterField::GenresInclude, 878);
    store.set_range(FilterField::VoteAverage, Some(7.0), Some(10.0));

    store.set_preset("top_rated");
    let state = store.state();
    assert_eq!(state.category, "top_rated");
    assert!(state.genres_include.contains(&878));
    assert_eq!(state.vote_average.unwrap().min, Some(7.0));
    assert_eq!(state.release_date, None);

    let request = build_catalog_request(state);
    assert_eq!(request.params.get("sort_by"), Some("vote_average.desc"));
    assert_eq!(request.params.get("vote_count.gte"), Some("200"));
    // 上限是哨兵值，不出现在请求里
    assert!(!request.params.contains("vote_average.lte"));
}

#[tokio::test(start_paused = true)]
async fn test_stale_request_is_aborted_by_new_transition() {
    let catalog = Arc::new(SlowCatalog::default());
    let mut session = FilterSession::new(MemoryHistory::default(), options());
    session.hydrate();

    let request = build_catalog_request(&session.settled());
    let signal = session.debounce().current_signal();
    let in_flight = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.fetch(&request, signal).await })
    };
    while catalog.started.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    session.update(|store| {
        store.toggle_in_set(FilterField::GenresInclude, 35);
    });

    let result = in_flight.await.unwrap();
    assert!(result.unwrap_err().is_abort());

    session.wait_settled().await;
    assert_eq!(session.current_query(), "with_genres=35");
}

#[tokio::test(start_paused = true)]
async fn test_request_started_while_settling_is_aborted_by_commit() {
    let catalog = Arc::new(SlowCatalog::default());
    let mut session = FilterSession::new(MemoryHistory::default(), options());
    session.hydrate();

    session.update(|store| {
        store.toggle_in_set(FilterField::GenresInclude, 12);
    });
    assert!(session.is_settling());

    // 防抖期间按旧的已稳定状态发出的请求
    let request = build_catalog_request(&session.settled());
    let signal = session.debounce().current_signal();
    let in_flight = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.fetch(&request, signal).await })
    };

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!session.is_settling());

    let result = in_flight.await.unwrap();
    assert!(result.unwrap_err().is_abort());
    assert_eq!(session.current_query(), "with_genres=12");

    let page = session.fetch(catalog.as_ref()).await.unwrap();
    let key = page.results[0]["key"].as_str().unwrap();
    assert!(key.contains("with_genres=12"));
}

#[tokio::test(start_paused = true)]
async fn test_settled_fetch_completes() {
    let catalog = SlowCatalog::default();
    let mut session = FilterSession::new(MemoryHistory::new("?query=matrix"), options());
    session.hydrate();

    let page = session.fetch(&catalog).await.unwrap();
    let key = page.results[0]["key"].as_str().unwrap();
    assert!(key.starts_with("search/movie?"));
}

fn param_strategy() -> impl Strategy<Value = (String, String)> {
    let names = prop::sample::select(vec![
        "type",
        "category",
        "query",
        "sort_by",
        "page",
        "include_adult",
        "with_genres",
        "without_genres",
        "with_keywords",
        "primary_release_date.gte",
        "first_air_date.lte",
        "with_runtime.gte",
        "with_runtime.lte",
        "vote_average.gte",
        "vote_count.gte",
        "with_original_language",
        "region",
        "watch_region",
        "with_watch_providers",
        "with_watch_monetization_types",
        "with_people",
        "with_networks",
        "certification",
        "unknown",
    ]);
    let values = prop_oneof![
        "[a-zA-Z0-9,.|-]{0,8}",
        "[0-9]{1,3}(,[0-9]{1,3}){0,3}",
        Just("2024-02-29".to_string()),
        Just("tv".to_string()),
        Just("vote_average.desc".to_string()),
        Just("flatrate|rent".to_string()),
        Just("US".to_string()),
        Just("fr".to_string()),
    ];
    (names, values).prop_map(|(name, value)| (name.to_string(), value))
}

proptest! {
    #[test]
    fn prop_url_normalization_is_idempotent(
        params in prop::collection::vec(param_strategy(), 0..10),
        tv_context in any::<bool>(),
    ) {
        let context = if tv_context { ContentType::Tv } else { ContentType::Movie };
        let codec = UrlCodec::new(context);
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let once = codec.normalize(&query);
        let twice = codec.normalize(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(codec.parse(&once), codec.parse(&twice));
    }

    #[test]
    fn prop_double_toggle_restores_set(
        initial in prop::collection::btree_set(1u32..50, 0..6),
        id in 1u32..50,
    ) {
        let mut state = create_default_filters(ContentType::Movie);
        state.genres_include = initial.clone();
        let mut store = FilterStore::with_state(state, PresetCatalog::new(today()));

        let first = store.toggle_in_set(FilterField::GenresInclude, id);
        prop_assert_eq!(first, !initial.contains(&id));
        store.toggle_in_set(FilterField::GenresInclude, id);
        prop_assert_eq!(&store.state().genres_include, &initial);
    }
}
