// ==========================================
// 排班派工系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少写入时的偶发 busy 错误
// - 建立系统级表（config_kv / ingestion_columns_meta）
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 列元数据登记表（所有导入表共享）
pub const META_TABLE: &str = "ingestion_columns_meta";

/// 配置键值表
pub const CONFIG_TABLE: &str = "config_kv";

/// 系统表名（导入数据不得写入）
pub const SYSTEM_TABLES: [&str; 2] = [CONFIG_TABLE, META_TABLE];

/// 导入表名与系统表冲突时追加的前缀
pub const SYSTEM_NAME_GUARD_PREFIX: &str = "data_";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化系统级表（幂等）
///
/// - config_kv: 配置键值（scope_id='global'）
/// - ingestion_columns_meta: (表, 列) → (原始列名, 推断类型)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS {META_TABLE} (
            table_name VARCHAR(128) NOT NULL,
            column_name VARCHAR(128) NOT NULL,
            original_name TEXT NULL,
            sql_type VARCHAR(64) NULL,
            PRIMARY KEY (table_name, column_name)
        );
        "#
    ))
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 WORKFORCE_APS_DB_PATH（若设置）
/// - 否则: 用户数据目录/workforce-aps/workforce_aps.db
/// - 取不到用户数据目录时: ./workforce_aps.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("WORKFORCE_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./workforce_aps.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("workforce-aps");
        // 目录创建失败时保留当前目录回退值
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("workforce_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('config_kv', ?1)",
                [META_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
