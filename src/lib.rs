// 筛选引擎后端库
//
// 本库提供影视目录高级筛选的核心功能，包括：
// - 筛选状态存储与分类预设
// - 防抖与请求取消
// - URL 查询串同步
// - 目录查询参数构建
// - 筛选预设持久化
// - HTTP API

pub mod api;
pub mod config;
pub mod external;
pub mod models;
pub mod ports;
pub mod services;
