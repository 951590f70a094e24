// 键值存储端口
//
// 预设等需要持久化的数据都通过 StoragePort 读写，
// 便于在浏览器之外（服务端渲染、测试）替换实现

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::services::error::StorageError;

/// 键值存储
#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// 内存存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个值（用于测试损坏数据等场景）
    pub async fn seed(&self, key: &str, value: &str) {
        self.values.write().await.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 基于 JSON 文件的存储
///
/// 整个文件是一个 `{ key: value }` 对象，写入时整体重写
pub struct JsonFileStorage {
    path: PathBuf,
    // 串行化读-改-写
    lock: RwLock<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        match serde_json::from_str::<HashMap<String, String>>(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                // 文件损坏，备份后按空存储处理
                tracing::warn!("Storage file {:?} is corrupted, starting empty: {}", self.path, e);
                self.backup_corrupted().await;
                Ok(HashMap::new())
            }
        }
    }

    async fn backup_corrupted(&self) {
        let backup_path = self.path.with_extension("json.backup");
        match fs::rename(&self.path, &backup_path).await {
            Ok(_) => tracing::info!("Backed up corrupted storage file to {:?}", backup_path),
            Err(e) => tracing::warn!("Failed to back up corrupted storage file: {}", e),
        }
    }
}

#[async_trait]
impl StoragePort for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&values)?;
        fs::write(&self.path, json).await?;
        tracing::debug!("Wrote storage key {} to {:?}", key, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_storage() -> (TempDir, JsonFileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("nested").join("store.json"));
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").await.unwrap(), None);
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_file_storage_creates_parent_dirs() {
        let (_temp_dir, storage) = create_temp_storage();
        assert_eq!(storage.get("presets").await.unwrap(), None);

        storage.set("presets", "[]").await.unwrap();
        storage.set("other", "1").await.unwrap();
        assert!(storage.path().exists());
        assert_eq!(storage.get("presets").await.unwrap(), Some("[]".to_string()));
        assert_eq!(storage.get("other").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_file_storage_recovers_from_corruption() {
        let (_temp_dir, storage) = create_temp_storage();
        std::fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        std::fs::write(storage.path(), "{ not json").unwrap();

        assert_eq!(storage.get("presets").await.unwrap(), None);
        assert!(storage.path().with_extension("json.backup").exists());

        storage.set("presets", "[]").await.unwrap();
        assert_eq!(storage.get("presets").await.unwrap(), Some("[]".to_string()));
    }
}
