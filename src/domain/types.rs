// ==========================================
// 排班派工系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 推断列类型 (Inferred Column Type)
// ==========================================
// 字符串按观测最大长度分档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlColumnType {
    Integer,
    Float,
    Date,
    DateTime,
    Varchar255,
    Varchar1024,
    Text,
}

impl SqlColumnType {
    /// 建表/加列使用的 SQL 类型声明
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlColumnType::Integer => "BIGINT",
            SqlColumnType::Float => "DOUBLE",
            SqlColumnType::Date => "DATE",
            SqlColumnType::DateTime => "DATETIME",
            SqlColumnType::Varchar255 => "VARCHAR(255)",
            SqlColumnType::Varchar1024 => "VARCHAR(1024)",
            SqlColumnType::Text => "TEXT",
        }
    }

    /// 按字符串最大长度选择档位
    pub fn string_tier(max_len: usize) -> Self {
        if max_len <= 255 {
            SqlColumnType::Varchar255
        } else if max_len <= 1024 {
            SqlColumnType::Varchar1024
        } else {
            SqlColumnType::Text
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            SqlColumnType::Varchar255 | SqlColumnType::Varchar1024 | SqlColumnType::Text
        )
    }
}

impl fmt::Display for SqlColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

// ==========================================
// 单文件导入状态 (Ingest Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Loaded,  // 已入库
    Missing, // 文件不存在
    Error,   // 读取/入库失败（不影响同批其他文件）
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStatus::Loaded => write!(f, "loaded"),
            IngestStatus::Missing => write!(f, "missing"),
            IngestStatus::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 逻辑数据集类型 (Extract Kind)
// ==========================================
// 每种逻辑数据集对应一张物理表，文件名为 {logical}.csv
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractKind {
    Competencies, // 人员资质
    Attendance,   // 出勤/班次
    Priorities,   // 资质优先级
    TaskLines,    // 任务行
    TaskSplits,   // 拆分任务（派工结果回填对象）
}

impl ExtractKind {
    pub const ALL: [ExtractKind; 5] = [
        ExtractKind::Competencies,
        ExtractKind::Attendance,
        ExtractKind::Priorities,
        ExtractKind::TaskLines,
        ExtractKind::TaskSplits,
    ];

    pub fn logical_name(&self) -> &'static str {
        match self {
            ExtractKind::Competencies => "competencies",
            ExtractKind::Attendance => "attendance",
            ExtractKind::Priorities => "priorities",
            ExtractKind::TaskLines => "task_lines",
            ExtractKind::TaskSplits => "task_splits",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.logical_name())
    }

    pub fn from_logical_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.logical_name() == name.trim())
    }
}

impl fmt::Display for ExtractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical_name())
    }
}
