// ==========================================
// 排班派工系统 - 数据集导入流水线
// ==========================================
// 流程: 解析 → 列名规范化 → 类型推断 → 结构同步 → 内容哈希 UPSERT
// 隔离: 单文件失败只影响该文件的结果记录，批次继续
// 事务: 单文件的结构同步 + 元数据登记 + 写入在同一事务内
// ==========================================

use crate::config::IngestSettings;
use crate::db::{SYSTEM_NAME_GUARD_PREFIX, SYSTEM_TABLES};
use crate::domain::table::{
    ColumnSpec, IngestOutcome, TableDescriptor, HASH_COLUMN, INGESTED_AT_COLUMN,
    PARTITION_COLUMN,
};
use crate::domain::types::ExtractKind;
use crate::importer::column_sanitizer::{sanitize_headers, sanitize_identifier};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{ExtractSource, RawTable, UniversalFileParser};
use crate::importer::row_hasher::row_hash;
use crate::importer::type_inferencer::TypeInferencer;
use crate::importer::value_coercer::coerce_value;
use crate::repository::ingest_repo::{upsert_rows_tx, IngestRow};
use crate::repository::schema_repo::{ensure_table_tx, upsert_column_meta_tx};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// IngestContext - 导入目标
// ==========================================
// 显式传入每次导入调用，替代进程级“当前数据库”
#[derive(Clone)]
pub struct IngestContext {
    pub conn: Arc<Mutex<Connection>>,
    /// 分区标签（组织单元）
    pub partition: Option<String>,
    /// 表名前缀
    pub table_prefix: Option<String>,
}

impl IngestContext {
    /// 基于已有连接创建上下文（确保系统表存在）
    pub fn new(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ImportError::LockError(e.to_string()))?;
            crate::db::init_schema(&guard)?;
        }
        Ok(Self {
            conn,
            partition: None,
            table_prefix: None,
        })
    }

    /// 打开数据库文件并创建上下文
    pub fn open(db_path: &str) -> ImportResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        let tag = partition.into();
        self.partition = if tag.trim().is_empty() {
            None
        } else {
            Some(tag.trim().to_string())
        };
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.table_prefix = if prefix.trim().is_empty() {
            None
        } else {
            Some(prefix)
        };
        self
    }

    /// 目标表名
    ///
    /// # 规则
    /// - 显式表名（规范化）优先
    /// - 其次 `{前缀}_{文件名主干}`
    /// - 否则 文件名主干
    /// - 与系统表同名时追加 `data_` 前缀
    pub fn table_name(&self, file_name: &str, table_override: Option<&str>) -> String {
        let name = match table_override.filter(|n| !n.trim().is_empty()) {
            Some(name) => sanitize_identifier(name),
            None => {
                let stem = Path::new(file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.prefixed(&sanitize_identifier(&stem))
            }
        };
        if SYSTEM_TABLES.contains(&name.as_str()) {
            format!("{}{}", SYSTEM_NAME_GUARD_PREFIX, name)
        } else {
            name
        }
    }

    fn prefixed(&self, base: &str) -> String {
        match &self.table_prefix {
            Some(prefix) => format!("{}_{}", sanitize_identifier(prefix), base),
            None => base.to_string(),
        }
    }
}

// ==========================================
// PreparedTable - 可直接写库的表
// ==========================================
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub descriptor: TableDescriptor,
    pub rows: Vec<IngestRow>,
}

impl PreparedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.descriptor.columns.iter().map(|c| c.name.clone()).collect()
    }
}

// ==========================================
// TableIngestor
// ==========================================
pub struct TableIngestor {
    settings: IngestSettings,
    parser: UniversalFileParser,
    inferencer: TypeInferencer,
}

impl TableIngestor {
    pub fn new(settings: IngestSettings) -> Self {
        Self {
            parser: UniversalFileParser::new(settings.format),
            inferencer: TypeInferencer::new(settings.sample_limit),
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// 导入单个文件
    ///
    /// # 返回
    /// - Ok(IngestOutcome): loaded 或 error 记录
    /// - Err(FileNotFound): 路径不存在（调用方映射为 missing）
    pub fn ingest_file(
        &self,
        ctx: &IngestContext,
        path: &Path,
        table_override: Option<&str>,
    ) -> ImportResult<IngestOutcome> {
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        Ok(self.ingest_source(ctx, &ExtractSource::path(path), table_override))
    }

    /// 导入内存字节（上传内容）
    pub fn ingest_bytes(
        &self,
        ctx: &IngestContext,
        name: &str,
        bytes: &[u8],
        table_override: Option<&str>,
    ) -> IngestOutcome {
        self.ingest_source(ctx, &ExtractSource::bytes(name, bytes), table_override)
    }

    /// 导入任意来源；任何失败都转为 error 记录
    pub fn ingest_source(
        &self,
        ctx: &IngestContext,
        source: &ExtractSource,
        table_override: Option<&str>,
    ) -> IngestOutcome {
        let file = source.display_name();
        let table = ctx.table_name(&file, table_override);
        let partition = ctx.partition.as_deref();

        let raw = match self.parser.parse_source(source) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(file = %file, error = %e, "文件读取失败");
                return IngestOutcome::error(&file, &table, format!("read failed: {}", e), partition);
            }
        };

        match self.load_table(ctx, &table, &raw) {
            Ok(upserted) => IngestOutcome::loaded(&file, &table, raw.len(), upserted, partition),
            Err(e) => {
                warn!(file = %file, table = %table, error = %e, "导入失败");
                IngestOutcome::error(&file, &table, format!("ingest failed: {}", e), partition)
            }
        }
    }

    /// 批量导入目录中的五类数据集（`{logical}.csv`）
    ///
    /// 缺失文件记为 missing；每个文件独立成败
    pub fn ingest_bundle(&self, ctx: &IngestContext, folder: &Path) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(ExtractKind::ALL.len());
        for kind in ExtractKind::ALL {
            let path = folder.join(kind.file_name());
            let table = ctx.prefixed(kind.logical_name());

            let outcome = match self.ingest_file(ctx, &path, Some(&table)) {
                Ok(outcome) => outcome,
                Err(ImportError::FileNotFound(_)) => {
                    info!(file = %path.display(), "数据集文件缺失");
                    IngestOutcome::missing(
                        kind.file_name(),
                        &table,
                        format!("{} not found", path.display()),
                        ctx.partition.as_deref(),
                    )
                }
                Err(e) => IngestOutcome::error(
                    kind.file_name(),
                    &table,
                    e.to_string(),
                    ctx.partition.as_deref(),
                ),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// 规范化 + 推断 + 哈希 + 类型转换（不触库）
    pub fn prepare(
        &self,
        table_name: &str,
        raw: &RawTable,
        partition: Option<&str>,
    ) -> ImportResult<PreparedTable> {
        let sanitized = sanitize_headers(&raw.headers);

        // 源文件中的分区列：仅在未显式指定分区时使用
        let mut source_partition_idx = None;
        let mut data_columns: Vec<(String, usize)> = Vec::new();
        for (name, idx) in sanitized.unique_columns() {
            match name.as_str() {
                HASH_COLUMN | INGESTED_AT_COLUMN => {
                    debug!(column = %name, "忽略源文件中的保留列");
                }
                PARTITION_COLUMN => source_partition_idx = Some(idx),
                _ => data_columns.push((name, idx)),
            }
        }

        let specs: Vec<ColumnSpec> = data_columns
            .iter()
            .map(|(name, idx)| ColumnSpec {
                name: name.clone(),
                sql_type: self.inferencer.infer(raw.column_values(*idx)),
                original_name: sanitized
                    .original_name(name)
                    .unwrap_or(name.as_str())
                    .to_string(),
            })
            .collect();

        let mut rows = Vec::with_capacity(raw.len());
        for row_idx in 0..raw.len() {
            let row_partition = match partition {
                Some(tag) => Some(tag.to_string()),
                None => source_partition_idx
                    .map(|idx| raw.cell(row_idx, idx).trim().to_string())
                    .filter(|v| !v.is_empty()),
            };

            let mut cells: Vec<(&str, &str)> = data_columns
                .iter()
                .map(|(name, idx)| (name.as_str(), raw.cell(row_idx, *idx)))
                .collect();
            cells.push((PARTITION_COLUMN, row_partition.as_deref().unwrap_or("")));
            let hash = row_hash(cells);

            let values = specs
                .iter()
                .zip(&data_columns)
                .map(|(spec, (_, idx))| {
                    coerce_value(raw.cell(row_idx, *idx), spec.sql_type, row_idx + 1, &spec.name)
                })
                .collect::<ImportResult<Vec<_>>>()?;

            rows.push(IngestRow {
                hash,
                partition: row_partition,
                values,
            });
        }

        Ok(PreparedTable {
            descriptor: TableDescriptor::new(table_name, specs),
            rows,
        })
    }

    /// 写库（单事务）；返回处理行数
    #[instrument(skip(self, ctx, raw), fields(table = %table_name, rows = raw.len(), batch_id))]
    fn load_table(&self, ctx: &IngestContext, table_name: &str, raw: &RawTable) -> ImportResult<usize> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        // === 步骤 1: 规范化 / 推断 / 哈希 ===
        let prepared = self.prepare(table_name, raw, ctx.partition.as_deref())?;
        debug!(
            columns = prepared.descriptor.columns.len(),
            "列规范化与类型推断完成"
        );

        let conn = ctx
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;

        // === 步骤 2: 结构同步 + 元数据登记 ===
        let sync = ensure_table_tx(&tx, &prepared.descriptor)?;
        upsert_column_meta_tx(&tx, table_name, &prepared.descriptor.columns)?;
        debug!(created = sync.created, added = sync.added_columns.len(), "表结构同步完成");

        // === 步骤 3: 分块 UPSERT ===
        let upserted = upsert_rows_tx(
            &tx,
            table_name,
            &prepared.column_names(),
            &prepared.rows,
            self.settings.chunk_size,
        )?;

        tx.commit()?;
        info!(batch_id = %batch_id, upserted, "数据集导入完成");
        Ok(upserted)
    }
}

impl Default for TableIngestor {
    fn default() -> Self {
        Self::new(IngestSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> IngestContext {
        IngestContext::new(Arc::new(Mutex::new(Connection::open_in_memory().unwrap()))).unwrap()
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_table_name_resolution() {
        let ctx = context();
        assert_eq!(ctx.table_name("Compétences RH.csv", None), "competences_rh");
        assert_eq!(ctx.table_name("x.csv", Some("Mon Tableau")), "mon_tableau");

        let ctx = ctx.with_prefix("Atelier Nord");
        assert_eq!(ctx.table_name("lignes.csv", None), "atelier_nord_lignes");
        assert_eq!(ctx.table_name("lignes.csv", Some("cible")), "cible");
    }

    #[test]
    fn test_table_name_never_targets_system_tables() {
        let ctx = context();
        assert_eq!(ctx.table_name("config_kv.csv", None), "data_config_kv");
        assert_eq!(
            ctx.table_name("x.csv", Some("Ingestion Columns Meta")),
            "data_ingestion_columns_meta"
        );
    }

    #[test]
    fn test_prepare_drops_reserved_and_uses_source_partition() {
        let raw = table(
            &["Nom", "row_hash", "Partition Tag", "Age"],
            &[&["Anne", "zzz", "nord", "30"], &["Bob", "yyy", "", "41"]],
        );
        let prepared = TableIngestor::default().prepare("staff", &raw, None).unwrap();

        assert_eq!(prepared.column_names(), vec!["nom", "age"]);
        assert_eq!(prepared.rows[0].partition.as_deref(), Some("nord"));
        assert_eq!(prepared.rows[1].partition, None);
        assert_ne!(prepared.rows[0].hash, "zzz");
    }

    #[test]
    fn test_explicit_partition_overrides_source_and_changes_hash() {
        let raw = table(&["Nom", "partition_tag"], &[&["Anne", "nord"]]);
        let ingestor = TableIngestor::default();
        let a = ingestor.prepare("staff", &raw, Some("sud")).unwrap();
        let b = ingestor.prepare("staff", &raw, None).unwrap();

        assert_eq!(a.rows[0].partition.as_deref(), Some("sud"));
        assert_ne!(a.rows[0].hash, b.rows[0].hash);
    }

    #[test]
    fn test_hash_ignores_source_column_order() {
        let ingestor = TableIngestor::default();
        let a = ingestor
            .prepare("t", &table(&["Nom", "Age"], &[&["Anne", "30"]]), None)
            .unwrap();
        let b = ingestor
            .prepare("t", &table(&["Age", "Nom"], &[&["30", "Anne"]]), None)
            .unwrap();
        assert_eq!(a.rows[0].hash, b.rows[0].hash);
    }

    #[test]
    fn test_conversion_failure_beyond_sample_fails_file() {
        let settings = IngestSettings {
            sample_limit: 1,
            ..IngestSettings::default()
        };
        let ingestor = TableIngestor::new(settings);
        let ctx = context();
        let outcome = ingestor.ingest_bytes(&ctx, "ages.csv", b"age\n1\nabc\n", None);

        assert_eq!(outcome.status, crate::domain::types::IngestStatus::Error);
        // 事务回滚：表未创建
        let conn = ctx.conn.lock().unwrap();
        let exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='ages'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 0);
    }

    #[test]
    fn test_ingest_file_missing_path() {
        let ctx = context();
        let result = TableIngestor::default().ingest_file(&ctx, Path::new("/no/such/file.csv"), None);
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
