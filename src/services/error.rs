// 筛选引擎错误类型定义
//
// 解析错误（URL 参数、损坏的预设数据）不在这里：它们总是降级为默认值，
// 只记录日志，不向调用方返回错误

use thiserror::Error;

/// 目录查询的错误类型
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 请求被新的筛选状态取代而中止，属于正常结束
    #[error("request aborted")]
    Aborted,

    #[error("catalog API key not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("catalog API error: status {0}")]
    Http(u16),

    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),
}

impl CatalogError {
    /// 是否为取消导致的错误，调用方不应把它展示给用户
    pub fn is_abort(&self) -> bool {
        matches!(self, CatalogError::Aborted)
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_status() {
            match err.status() {
                Some(status) => CatalogError::Http(status.as_u16()),
                None => CatalogError::Network(err.to_string()),
            }
        } else if err.is_decode() {
            CatalogError::InvalidResponse(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

/// 持久化存储的错误类型
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Backend(String),
}

/// 预设管理的错误类型
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset name cannot be empty")]
    EmptyName,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
