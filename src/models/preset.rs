use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filter::FilterState;

/// 已保存的筛选预设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 筛选条件（不含界面状态）
    pub filters: FilterState,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub usage_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建预设的请求数据
#[derive(Debug, Clone, Deserialize)]
pub struct NewPreset {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub filters: FilterState,
    #[serde(default)]
    pub is_public: bool,
}

/// 预设的可修改字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

impl FilterPreset {
    pub fn create(new_preset: NewPreset) -> Self {
        let now = Utc::now();
        let description = new_preset
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Self {
            id: Uuid::new_v4().to_string(),
            name: new_preset.name.trim().to_string(),
            description,
            filters: new_preset.filters.without_ui(),
            is_public: new_preset.is_public,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
