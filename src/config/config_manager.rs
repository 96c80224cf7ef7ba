// ==========================================
// 排班派工系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::{
    AssignSettings, FileFormat, IngestSettings, DEFAULT_BACKUP_TIMESTAMP_FORMAT,
    DEFAULT_CHUNK_SIZE, DEFAULT_ENCODING, DEFAULT_MAX_PASSES, DEFAULT_MAX_PER_RESOURCE_PER_DAY,
    DEFAULT_OUTPUT_COLUMN, DEFAULT_SAMPLE_LIMIT,
};
use crate::config::settings_reader::SettingsReader;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键常量
pub mod config_keys {
    pub const INGEST_DELIMITER: &str = "ingest.delimiter";
    pub const INGEST_ENCODING: &str = "ingest.encoding";
    pub const INGEST_CHUNK_SIZE: &str = "ingest.chunk_size";
    pub const INGEST_SAMPLE_LIMIT: &str = "ingest.sample_limit";

    pub const ASSIGN_MAX_PER_RESOURCE_PER_DAY: &str = "assign.max_per_resource_per_day";
    pub const ASSIGN_MAX_PASSES: &str = "assign.max_passes";
    pub const ASSIGN_OUTPUT_COLUMN: &str = "assign.output_column";
    pub const ASSIGN_BACKUP_TIMESTAMP_FORMAT: &str = "assign.backup_timestamp_format";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并确保系统表存在（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
            crate::db::init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析数值配置；格式错误时记录告警并回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        default = %default,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入配置值（UPSERT）
    pub fn set_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 派工运行时记录所用参数，便于复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    fn load_file_format(&self) -> ConfigResult<FileFormat> {
        let delimiter = self.get_config_or_default(config_keys::INGEST_DELIMITER, ";")?;
        let encoding = self.get_config_or_default(config_keys::INGEST_ENCODING, DEFAULT_ENCODING)?;
        FileFormat::from_labels(&delimiter, &encoding)
    }
}

// ==========================================
// SettingsReader Trait 实现
// ==========================================
impl SettingsReader for ConfigManager {
    fn ingest_settings(&self) -> ConfigResult<IngestSettings> {
        let settings = IngestSettings {
            format: self.load_file_format()?,
            chunk_size: self.get_parsed_or_default(config_keys::INGEST_CHUNK_SIZE, DEFAULT_CHUNK_SIZE)?,
            sample_limit: self
                .get_parsed_or_default(config_keys::INGEST_SAMPLE_LIMIT, DEFAULT_SAMPLE_LIMIT)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn assign_settings(&self) -> ConfigResult<AssignSettings> {
        let settings = AssignSettings {
            format: self.load_file_format()?,
            max_per_resource_per_day: self.get_parsed_or_default(
                config_keys::ASSIGN_MAX_PER_RESOURCE_PER_DAY,
                DEFAULT_MAX_PER_RESOURCE_PER_DAY,
            )?,
            max_passes: self.get_parsed_or_default(config_keys::ASSIGN_MAX_PASSES, DEFAULT_MAX_PASSES)?,
            output_column: self
                .get_config_or_default(config_keys::ASSIGN_OUTPUT_COLUMN, DEFAULT_OUTPUT_COLUMN)?,
            backup_timestamp_format: self.get_config_or_default(
                config_keys::ASSIGN_BACKUP_TIMESTAMP_FORMAT,
                DEFAULT_BACKUP_TIMESTAMP_FORMAT,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let cm = manager();
        let ingest = cm.ingest_settings().unwrap();
        assert_eq!(ingest.format.delimiter, b';');
        assert_eq!(ingest.format.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(ingest.chunk_size, 1000);

        let assign = cm.assign_settings().unwrap();
        assert_eq!(assign.max_per_resource_per_day, 1);
        assert_eq!(assign.max_passes, 10);
        assert_eq!(assign.output_column, "Ressource_affectee");
    }

    #[test]
    fn test_overrides_and_snapshot() {
        let cm = manager();
        cm.set_value(config_keys::ASSIGN_MAX_PER_RESOURCE_PER_DAY, "3").unwrap();
        cm.set_value(config_keys::INGEST_DELIMITER, ",").unwrap();
        cm.set_value(config_keys::ASSIGN_MAX_PER_RESOURCE_PER_DAY, "4").unwrap();

        assert_eq!(cm.assign_settings().unwrap().max_per_resource_per_day, 4);
        assert_eq!(cm.ingest_settings().unwrap().format.delimiter, b',');

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[config_keys::ASSIGN_MAX_PER_RESOURCE_PER_DAY], "4");
    }

    #[test]
    fn test_malformed_number_falls_back_to_default() {
        let cm = manager();
        cm.set_value(config_keys::INGEST_CHUNK_SIZE, "lots").unwrap();
        assert_eq!(cm.ingest_settings().unwrap().chunk_size, 1000);
    }

    #[test]
    fn test_zero_cap_is_rejected() {
        let cm = manager();
        cm.set_value(config_keys::ASSIGN_MAX_PER_RESOURCE_PER_DAY, "0").unwrap();
        assert!(matches!(
            cm.assign_settings(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
