// ==========================================
// 排班派工系统 - 导入数据写入仓储
// ==========================================
// 职责: 按内容哈希分块 UPSERT、行数/哈希查询
// 红线: Repository 不含业务逻辑（哈希、类型转换在导入层完成）
// ==========================================

use crate::domain::table::{HASH_COLUMN, INGESTED_AT_COLUMN, PARTITION_COLUMN};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::schema_repo::{quote_ident, table_exists_tx};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex};

/// 单条语句绑定参数上限（SQLite 默认 32766，留余量）
const MAX_BOUND_PARAMS: usize = 32_000;

// ==========================================
// IngestRow - 待写入行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRow {
    pub hash: String,
    pub partition: Option<String>,
    /// 与列清单一一对应的已转换值
    pub values: Vec<Value>,
}

/// 按分块 UPSERT
///
/// 冲突（同一哈希）时覆盖全部非键列；返回处理行数
///
/// # 参数
/// - columns: 数据列（不含保留列），与 IngestRow::values 对齐
/// - chunk_size: 每条语句的最大行数（受绑定参数上限进一步约束）
pub fn upsert_rows_tx(
    conn: &Connection,
    table: &str,
    columns: &[String],
    rows: &[IngestRow],
    chunk_size: usize,
) -> RepositoryResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut target_columns = vec![quote_ident(HASH_COLUMN)?, quote_ident(PARTITION_COLUMN)?];
    for column in columns {
        target_columns.push(quote_ident(column)?);
    }
    let ingested_at = quote_ident(INGESTED_AT_COLUMN)?;

    let bound_per_row = target_columns.len();
    let rows_per_chunk = chunk_size
        .max(1)
        .min((MAX_BOUND_PARAMS / bound_per_row).max(1));

    let update_set: Vec<String> = target_columns
        .iter()
        .skip(1)
        .chain(std::iter::once(&ingested_at))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();

    let row_placeholder = format!(
        "({}, datetime('now'))",
        vec!["?"; bound_per_row].join(", ")
    );

    let mut processed = 0;
    for chunk in rows.chunks(rows_per_chunk) {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES {} ON CONFLICT({}) DO UPDATE SET {}",
            quote_ident(table)?,
            target_columns.join(", "),
            ingested_at,
            vec![row_placeholder.as_str(); chunk.len()].join(", "),
            quote_ident(HASH_COLUMN)?,
            update_set.join(", ")
        );

        let mut bound: Vec<Value> = Vec::with_capacity(chunk.len() * bound_per_row);
        for row in chunk {
            if row.values.len() != columns.len() {
                return Err(RepositoryError::DatabaseQueryError(format!(
                    "值数量 {} 与列数量 {} 不一致",
                    row.values.len(),
                    columns.len()
                )));
            }
            bound.push(Value::Text(row.hash.clone()));
            bound.push(match &row.partition {
                Some(p) => Value::Text(p.clone()),
                None => Value::Null,
            });
            bound.extend(row.values.iter().cloned());
        }

        conn.execute(&sql, params_from_iter(bound))?;
        processed += chunk.len();
        tracing::debug!(table, chunk_rows = chunk.len(), processed, "分块写入完成");
    }

    Ok(processed)
}

pub fn count_rows_tx(conn: &Connection, table: &str) -> RepositoryResult<i64> {
    if !table_exists_tx(conn, table)? {
        return Err(RepositoryError::TableNotFound(table.to_string()));
    }
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)?),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ==========================================
// IngestRepository
// ==========================================
pub struct IngestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl IngestRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 单事务写入（失败整体回滚）
    pub fn upsert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[IngestRow],
        chunk_size: usize,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let processed = upsert_rows_tx(&tx, table, columns, rows, chunk_size)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(processed)
    }

    pub fn count_rows(&self, table: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        count_rows_tx(&conn, table)
    }

    /// 某分区的行数
    pub fn count_rows_in_partition(&self, table: &str, partition: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        if !table_exists_tx(&conn, table)? {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                quote_ident(table)?,
                quote_ident(PARTITION_COLUMN)?
            ),
            [partition],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 全部内容哈希（升序）
    pub fn list_hashes(&self, table: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        if !table_exists_tx(&conn, table)? {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }
        let hash = quote_ident(HASH_COLUMN)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {hash} FROM {} WHERE {hash} IS NOT NULL ORDER BY {hash}",
            quote_ident(table)?
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut hashes = Vec::new();
        for row in rows {
            hashes.push(row?);
        }
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{ColumnSpec, TableDescriptor};
    use crate::domain::types::SqlColumnType;
    use crate::repository::schema_repo::SchemaRepository;

    fn setup() -> (SchemaRepository, IngestRepository) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let schema = SchemaRepository::from_connection(shared.clone());
        schema
            .ensure_table(&TableDescriptor::new(
                "staff",
                vec![
                    ColumnSpec {
                        name: "nom".to_string(),
                        sql_type: SqlColumnType::Varchar255,
                        original_name: "Nom".to_string(),
                    },
                    ColumnSpec {
                        name: "age".to_string(),
                        sql_type: SqlColumnType::Integer,
                        original_name: "Age".to_string(),
                    },
                ],
            ))
            .unwrap();
        (schema, IngestRepository::from_connection(shared))
    }

    fn row(hash: &str, nom: &str, age: i64) -> IngestRow {
        IngestRow {
            hash: hash.to_string(),
            partition: Some("p1".to_string()),
            values: vec![Value::Text(nom.to_string()), Value::Integer(age)],
        }
    }

    fn columns() -> Vec<String> {
        vec!["nom".to_string(), "age".to_string()]
    }

    #[test]
    fn test_upsert_is_idempotent_on_hash() {
        let (_schema, repo) = setup();
        let rows = vec![row("h1", "ANNE", 30), row("h2", "BOB", 41), row("h3", "CHLOE", 25)];

        assert_eq!(repo.upsert_rows("staff", &columns(), &rows, 2).unwrap(), 3);
        assert_eq!(repo.upsert_rows("staff", &columns(), &rows, 2).unwrap(), 3);
        assert_eq!(repo.count_rows("staff").unwrap(), 3);
        assert_eq!(repo.count_rows_in_partition("staff", "p1").unwrap(), 3);
        assert_eq!(repo.list_hashes("staff").unwrap(), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn test_conflict_overwrites_non_key_columns() {
        let (_schema, repo) = setup();
        repo.upsert_rows("staff", &columns(), &[row("h1", "ANNE", 30)], 10)
            .unwrap();
        repo.upsert_rows("staff", &columns(), &[row("h1", "ANNE", 31)], 10)
            .unwrap();

        let conn = repo.get_conn().unwrap();
        let age: i64 = conn
            .query_row("SELECT age FROM staff WHERE row_hash = 'h1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(age, 31);
    }

    #[test]
    fn test_value_count_mismatch_rolls_back() {
        let (_schema, repo) = setup();
        let bad = IngestRow {
            hash: "hx".to_string(),
            partition: None,
            values: vec![Value::Null],
        };
        let rows = vec![row("h1", "ANNE", 30), bad];
        assert!(repo.upsert_rows("staff", &columns(), &rows, 1).is_err());
        assert_eq!(repo.count_rows("staff").unwrap(), 0);
    }

    #[test]
    fn test_queries_on_missing_table() {
        let (_schema, repo) = setup();
        assert!(matches!(
            repo.count_rows("ghost"),
            Err(RepositoryError::TableNotFound(_))
        ));
        assert!(repo.list_hashes("ghost").is_err());
    }
}
