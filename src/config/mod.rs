// ==========================================
// 排班派工系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod error;
pub mod settings;
pub mod settings_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use settings::{AssignSettings, FileFormat, IngestSettings};
pub use settings_reader::{SettingsReader, StaticSettings};
