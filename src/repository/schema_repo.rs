// ==========================================
// 排班派工系统 - 导入表结构仓储
// ==========================================
// 职责: 建表 / 补列 / 分区索引 / 列元数据登记
// 红线: Repository 不含业务逻辑（类型推断、列名规范化在导入层完成）
// 约束: 动态标识符必须先通过 quote_ident 校验
// ==========================================

use crate::db::META_TABLE;
use crate::domain::table::{
    is_reserved_column, ColumnSpec, TableDescriptor, HASH_COLUMN, INGESTED_AT_COLUMN,
    PARTITION_COLUMN, PARTITION_SQL_TYPE,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 哈希列类型（SHA-256 十六进制）
const HASH_SQL_TYPE: &str = "CHAR(64)";

// ==========================================
// 实体
// ==========================================

/// 列元数据登记记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetaEntity {
    pub table_name: String,
    pub column_name: String,
    pub original_name: Option<String>,
    pub sql_type: Option<String>,
}

/// 一次结构同步的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSyncResult {
    pub created: bool,
    pub added_columns: Vec<String>,
}

// ==========================================
// 标识符工具
// ==========================================

/// 校验并加引号
///
/// 只接受 [A-Za-z0-9_]+，其余一律拒绝
pub fn quote_ident(name: &str) -> RepositoryResult<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RepositoryError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name))
}

pub fn table_exists_tx(conn: &Connection, table: &str) -> RepositoryResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// 现有列（按表定义顺序）
pub fn existing_columns_tx(conn: &Connection, table: &str) -> RepositoryResult<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

fn create_partition_index_tx(conn: &Connection, table: &str) -> RepositoryResult<()> {
    let index = quote_ident(&format!("idx_{}_{}", table, PARTITION_COLUMN))?;
    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            index,
            quote_ident(table)?,
            quote_ident(PARTITION_COLUMN)?
        ),
        [],
    )?;
    Ok(())
}

fn data_column_defs(columns: &[ColumnSpec]) -> RepositoryResult<Vec<String>> {
    columns
        .iter()
        .filter(|c| !is_reserved_column(&c.name))
        .map(|c| Ok(format!("{} {} NULL", quote_ident(&c.name)?, c.sql_type.as_sql())))
        .collect()
}

/// 在给定连接/事务内同步表结构
///
/// # 规则
/// - 表不存在: 建表（哈希主键 + 分区列 + 数据列 + 入库时间）并建分区索引
/// - 表已存在: 依次补齐哈希列（唯一索引）、分区列、缺失的数据列
/// - 保留列名不参与动态加列
pub fn ensure_table_tx(
    conn: &Connection,
    descriptor: &TableDescriptor,
) -> RepositoryResult<SchemaSyncResult> {
    let table = descriptor.table_name.as_str();
    let quoted_table = quote_ident(table)?;

    if !table_exists_tx(conn, table)? {
        let mut defs = vec![
            format!("{} {} PRIMARY KEY", quote_ident(HASH_COLUMN)?, HASH_SQL_TYPE),
            format!("{} {} NULL", quote_ident(PARTITION_COLUMN)?, PARTITION_SQL_TYPE),
        ];
        defs.extend(data_column_defs(&descriptor.columns)?);
        defs.push(format!(
            "{} DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP",
            quote_ident(INGESTED_AT_COLUMN)?
        ));

        conn.execute(
            &format!("CREATE TABLE {} (\n    {}\n)", quoted_table, defs.join(",\n    ")),
            [],
        )?;
        create_partition_index_tx(conn, table)?;

        tracing::info!(table, columns = descriptor.columns.len(), "新建导入表");
        return Ok(SchemaSyncResult {
            created: true,
            added_columns: descriptor.columns.iter().map(|c| c.name.clone()).collect(),
        });
    }

    let existing: HashSet<String> = existing_columns_tx(conn, table)?.into_iter().collect();
    let mut added = Vec::new();

    // 已有表无法追加主键：补哈希列 + 唯一索引（UPSERT 冲突目标）
    if !existing.contains(HASH_COLUMN) {
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {} NULL",
                quoted_table,
                quote_ident(HASH_COLUMN)?,
                HASH_SQL_TYPE
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&format!("ux_{}_{}", table, HASH_COLUMN))?,
                quoted_table,
                quote_ident(HASH_COLUMN)?
            ),
            [],
        )?;
        added.push(HASH_COLUMN.to_string());
    }

    if !existing.contains(PARTITION_COLUMN) {
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {} NULL",
                quoted_table,
                quote_ident(PARTITION_COLUMN)?,
                PARTITION_SQL_TYPE
            ),
            [],
        )?;
        added.push(PARTITION_COLUMN.to_string());
    }
    create_partition_index_tx(conn, table)?;

    // SQLite 不允许 ALTER 追加非常量默认值，入库时间由写入语句显式赋值
    if !existing.contains(INGESTED_AT_COLUMN) {
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} DATETIME NULL",
                quoted_table,
                quote_ident(INGESTED_AT_COLUMN)?
            ),
            [],
        )?;
        added.push(INGESTED_AT_COLUMN.to_string());
    }

    for column in &descriptor.columns {
        if is_reserved_column(&column.name) || existing.contains(&column.name) {
            continue;
        }
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {} NULL",
                quoted_table,
                quote_ident(&column.name)?,
                column.sql_type.as_sql()
            ),
            [],
        )?;
        added.push(column.name.clone());
    }

    if !added.is_empty() {
        tracing::info!(table, added = ?added, "导入表补列");
    }
    Ok(SchemaSyncResult {
        created: false,
        added_columns: added,
    })
}

/// 登记列元数据（UPSERT，后写覆盖）
pub fn upsert_column_meta_tx(
    conn: &Connection,
    table: &str,
    columns: &[ColumnSpec],
) -> RepositoryResult<usize> {
    let mut stmt = conn.prepare(&format!(
        r#"
        INSERT INTO {META_TABLE} (table_name, column_name, original_name, sql_type)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(table_name, column_name) DO UPDATE SET
            original_name = excluded.original_name,
            sql_type = excluded.sql_type
        "#
    ))?;

    let mut count = 0;
    for column in columns.iter().filter(|c| !is_reserved_column(&c.name)) {
        stmt.execute(params![
            table,
            column.name,
            column.original_name,
            column.sql_type.as_sql()
        ])?;
        count += 1;
    }
    Ok(count)
}

// ==========================================
// SchemaRepository
// ==========================================
pub struct SchemaRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SchemaRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 同步表结构并登记元数据（单事务）
    pub fn ensure_table(&self, descriptor: &TableDescriptor) -> RepositoryResult<SchemaSyncResult> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let result = ensure_table_tx(&tx, descriptor)?;
        upsert_column_meta_tx(&tx, &descriptor.table_name, &descriptor.columns)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(result)
    }

    pub fn table_exists(&self, table: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        table_exists_tx(&conn, table)
    }

    /// 表的物理列（含保留列）
    pub fn table_columns(&self, table: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        if !table_exists_tx(&conn, table)? {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }
        existing_columns_tx(&conn, table)
    }

    /// 列元数据（按列名排序）
    pub fn column_metadata(&self, table: &str) -> RepositoryResult<Vec<ColumnMetaEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT table_name, column_name, original_name, sql_type
            FROM {META_TABLE}
            WHERE table_name = ?1
            ORDER BY column_name
            "#
        ))?;

        let rows = stmt.query_map(params![table], |row| {
            Ok(ColumnMetaEntity {
                table_name: row.get(0)?,
                column_name: row.get(1)?,
                original_name: row.get(2)?,
                sql_type: row.get(3)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
