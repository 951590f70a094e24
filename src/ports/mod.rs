// 外部环境抽象
//
// 浏览器历史和本地存储不再直接作为全局对象访问，而是通过注入的端口使用：
// - NavigationPort: 读取 / 写入当前 URL 查询串
// - StoragePort: 键值存储（预设持久化）

pub mod navigation;
pub mod storage;

pub use navigation::{MemoryHistory, NavigationPort};
pub use storage::{JsonFileStorage, MemoryStorage, StoragePort};
