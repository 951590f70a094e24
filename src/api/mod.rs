pub mod discover;
pub mod error;
pub mod health;
pub mod presets;
pub mod response;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::external::{CachedCatalog, CatalogPort, TmdbCatalog};
use crate::ports::{JsonFileStorage, StoragePort};
use crate::services::preset_library::PresetLibrary;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// 未配置 TMDB API Key 时为 None
    pub catalog: Option<Arc<dyn CatalogPort>>,
    pub presets: Arc<RwLock<PresetLibrary>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        catalog: Option<Arc<dyn CatalogPort>>,
        presets: PresetLibrary,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            presets: Arc::new(RwLock::new(presets)),
        }
    }

    /// 按配置创建目录客户端和预设库
    pub async fn from_config(config: AppConfig) -> Self {
        let catalog = config.tmdb_api_key.clone().map(|api_key| {
            let tmdb = TmdbCatalog::new(api_key)
                .with_base_url(config.tmdb_base_url.clone())
                .with_language(config.tmdb_language.clone());
            Arc::new(CachedCatalog::new(tmdb, config.catalog_cache_ttl)) as Arc<dyn CatalogPort>
        });
        if catalog.is_none() {
            tracing::warn!("TMDB_API_KEY not set, /api/discover will be unavailable");
        }

        let storage: Arc<dyn StoragePort> =
            Arc::new(JsonFileStorage::new(config.preset_store_path.clone()));
        let presets = PresetLibrary::load(storage, config.max_presets).await;

        Self::new(config, catalog, presets)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Filter Engine Backend API v1.0" }))
        .route("/api/health", get(health::health_check))
        // Catalog filtering
        .route("/api/discover", get(discover::discover))
        .route("/api/filters/query", get(discover::filters_query))
        // Presets
        .route(
            "/api/presets",
            get(presets::list_presets).post(presets::create_preset),
        )
        .route(
            "/api/presets/:id",
            put(presets::update_preset).delete(presets::delete_preset),
        )
        .route("/api/presets/:id/load", post(presets::load_preset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
