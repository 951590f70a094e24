// 应用配置
//
// 从环境变量读取（启动时先加载 .env），无效值回退到默认值并记录警告

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::external::TmdbCatalog;
use crate::services::preset_library::DEFAULT_MAX_PRESETS;

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// TMDB API Key，未配置时目录查询接口不可用
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub max_presets: usize,
    pub preset_store_path: PathBuf,
    pub catalog_cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tmdb_api_key: None,
            tmdb_base_url: TmdbCatalog::DEFAULT_BASE_URL.to_string(),
            tmdb_language: "en-US".to_string(),
            max_presets: DEFAULT_MAX_PRESETS,
            preset_store_path: PathBuf::from("presets.json"),
            catalog_cache_ttl: Duration::from_secs(600),
        }
    }
}

impl AppConfig {
    /// 从进程环境变量读取配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过给定的查找函数读取配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            tmdb_api_key: text("TMDB_API_KEY"),
            tmdb_base_url: text("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url),
            tmdb_language: text("TMDB_LANGUAGE").unwrap_or(defaults.tmdb_language),
            max_presets: parse_or(&lookup, "MAX_PRESETS", defaults.max_presets),
            preset_store_path: text("PRESET_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.preset_store_path),
            catalog_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CATALOG_CACHE_TTL_SECS",
                defaults.catalog_cache_ttl.as_secs(),
            )),
        }
    }

    pub fn tmdb_configured(&self) -> bool {
        self.tmdb_api_key.is_some()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}
