// 筛选预设库
//
// 用户保存的命名筛选条件，序列化为 JSON 数组存到 StoragePort 的固定键下。
// 存储内容损坏时按空列表处理，不影响页面使用

use chrono::Utc;
use std::sync::Arc;

use crate::models::{FilterPreset, FilterState, NewPreset, PresetUpdate};
use crate::ports::StoragePort;
use crate::services::error::{PresetError, StorageError};

/// 存储键
pub const PRESET_STORAGE_KEY: &str = "filter-engine:presets";

/// 默认最多保存的预设数量
pub const DEFAULT_MAX_PRESETS: usize = 20;

/// 预设库
///
/// 内部列表按最近修改排在前面的顺序维护
pub struct PresetLibrary {
    storage: Arc<dyn StoragePort>,
    presets: Vec<FilterPreset>,
    max_presets: usize,
}

impl PresetLibrary {
    /// 从存储中加载预设库
    ///
    /// 数据不存在或无法解析时返回空库
    pub async fn load(storage: Arc<dyn StoragePort>, max_presets: usize) -> Self {
        let presets = match storage.get(PRESET_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<FilterPreset>>(&raw) {
                Ok(mut presets) => {
                    presets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                    tracing::info!("Loaded {} filter presets", presets.len());
                    presets
                }
                Err(e) => {
                    tracing::warn!("预设数据损坏，使用空列表: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("读取预设失败，使用空列表: {}", e);
                Vec::new()
            }
        };

        Self {
            storage,
            presets,
            max_presets,
        }
    }

    pub fn max_presets(&self) -> usize {
        self.max_presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.presets.len() >= self.max_presets
    }

    /// 所有预设，最近修改的在前
    pub fn presets(&self) -> Vec<FilterPreset> {
        let mut presets = self.presets.clone();
        presets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        presets
    }

    pub fn get(&self, id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// 使用次数最多的 n 个预设
    pub fn most_used(&self, n: usize) -> Vec<FilterPreset> {
        let mut presets = self.presets();
        presets.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        presets.truncate(n);
        presets
    }

    /// 名称是否已被占用（忽略大小写和首尾空白）
    pub fn preset_name_exists(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.presets
            .iter()
            .any(|p| p.name.trim().to_lowercase() == name)
    }

    /// 保存新预设
    ///
    /// 已达到数量上限时返回 `Ok(None)`
    pub async fn save_preset(
        &mut self,
        new_preset: NewPreset,
    ) -> Result<Option<FilterPreset>, PresetError> {
        if new_preset.name.trim().is_empty() {
            return Err(PresetError::EmptyName);
        }
        if self.is_full() {
            tracing::debug!("Preset limit {} reached, not saving", self.max_presets);
            return Ok(None);
        }

        let preset = FilterPreset::create(new_preset);
        let mut next = self.presets.clone();
        next.insert(0, preset.clone());
        self.commit(next).await?;

        tracing::info!("Saved filter preset {} ({})", preset.name, preset.id);
        Ok(Some(preset))
    }

    /// 载入预设，返回其筛选条件并增加使用次数
    pub async fn load_preset(&mut self, id: &str) -> Result<Option<FilterState>, PresetError> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let mut next = self.presets.clone();
        let mut preset = next.remove(index);
        preset.usage_count = preset.usage_count.saturating_add(1);
        preset.updated_at = Utc::now();
        let filters = preset.filters.clone();
        next.insert(0, preset);
        self.commit(next).await?;

        tracing::info!("Loaded filter preset {}", id);
        Ok(Some(filters))
    }

    /// 修改预设的名称、描述或公开状态
    pub async fn update_preset(
        &mut self,
        id: &str,
        update: PresetUpdate,
    ) -> Result<Option<FilterPreset>, PresetError> {
        if matches!(&update.name, Some(name) if name.trim().is_empty()) {
            return Err(PresetError::EmptyName);
        }
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let mut next = self.presets.clone();
        let mut preset = next.remove(index);
        if let Some(name) = update.name {
            preset.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            let description = description.trim();
            preset.description = (!description.is_empty()).then(|| description.to_string());
        }
        if let Some(is_public) = update.is_public {
            preset.is_public = is_public;
        }
        preset.updated_at = Utc::now();

        next.insert(0, preset.clone());
        self.commit(next).await?;
        Ok(Some(preset))
    }

    /// 删除预设，返回是否存在
    pub async fn delete_preset(&mut self, id: &str) -> Result<bool, PresetError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let mut next = self.presets.clone();
        let removed = next.remove(index);
        self.commit(next).await?;

        tracing::info!("Deleted filter preset {}", removed.name);
        Ok(true)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.id == id)
    }

    /// 写入存储成功后才替换内存中的列表
    async fn commit(&mut self, next: Vec<FilterPreset>) -> Result<(), PresetError> {
        let json = serde_json::to_string(&next).map_err(StorageError::from)?;
        self.storage.set(PRESET_STORAGE_KEY, &json).await?;
        self.presets = next;
        Ok(())
    }
}
