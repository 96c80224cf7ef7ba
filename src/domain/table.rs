// ==========================================
// 排班派工系统 - 导入表描述与导入结果
// ==========================================

use crate::domain::types::{IngestStatus, SqlColumnType};
use serde::{Deserialize, Serialize};

/// 内容哈希列（物理主键）
pub const HASH_COLUMN: &str = "row_hash";
/// 分区列（组织单元标签）
pub const PARTITION_COLUMN: &str = "partition_tag";
/// 入库时间列
pub const INGESTED_AT_COLUMN: &str = "ingested_at";

/// 保留列名：不参与动态加列
pub const RESERVED_COLUMNS: [&str; 3] = [HASH_COLUMN, PARTITION_COLUMN, INGESTED_AT_COLUMN];

/// 分区列类型
pub const PARTITION_SQL_TYPE: &str = "VARCHAR(64)";

pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

// ==========================================
// ColumnSpec - 单列描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,          // 规范化列名
    pub sql_type: SqlColumnType,
    pub original_name: String, // 源文件表头
}

// ==========================================
// TableDescriptor - 目标表描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub table_name: String,
    /// 数据列（按源文件顺序，不含保留列）
    pub columns: Vec<ColumnSpec>,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

// ==========================================
// IngestOutcome - 单文件导入结果记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub file: String,
    pub table: String,
    pub status: IngestStatus,
    pub rows: usize,
    pub upserted: usize,
    pub message: String,
    pub partition: String,
}

impl IngestOutcome {
    pub fn loaded(
        file: impl Into<String>,
        table: impl Into<String>,
        rows: usize,
        upserted: usize,
        partition: Option<&str>,
    ) -> Self {
        Self {
            file: file.into(),
            table: table.into(),
            status: IngestStatus::Loaded,
            rows,
            upserted,
            message: "ok (dedupe by partition + all columns)".to_string(),
            partition: partition.unwrap_or_default().to_string(),
        }
    }

    pub fn missing(
        file: impl Into<String>,
        table: impl Into<String>,
        message: impl Into<String>,
        partition: Option<&str>,
    ) -> Self {
        Self {
            file: file.into(),
            table: table.into(),
            status: IngestStatus::Missing,
            rows: 0,
            upserted: 0,
            message: message.into(),
            partition: partition.unwrap_or_default().to_string(),
        }
    }

    pub fn error(
        file: impl Into<String>,
        table: impl Into<String>,
        message: impl Into<String>,
        partition: Option<&str>,
    ) -> Self {
        Self {
            file: file.into(),
            table: table.into(),
            status: IngestStatus::Error,
            rows: 0,
            upserted: 0,
            message: message.into(),
            partition: partition.unwrap_or_default().to_string(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == IngestStatus::Loaded
    }
}
