// ==========================================
// 排班派工系统 - 单元格值转换
// ==========================================
// 按推断类型把文本单元格转换为 SQLite 值
// 空单元格 → NULL；无法转换 → TypeConversionError（整个文件失败）
// ==========================================

use crate::common::dates::parse_day_first;
use crate::domain::types::SqlColumnType;
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::types::Value;

pub const DATE_STORAGE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 转换单元格
///
/// # 参数
/// - row: 数据行号（1 起，用于错误定位）
/// - column: 规范化列名
pub fn coerce_value(raw: &str, sql_type: SqlColumnType, row: usize, column: &str) -> ImportResult<Value> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(Value::Null);
    }

    let fail = || ImportError::TypeConversionError {
        row,
        column: column.to_string(),
        value: value.to_string(),
        expected: sql_type.as_sql().to_string(),
    };

    match sql_type {
        SqlColumnType::Integer => value.parse::<i64>().map(Value::Integer).map_err(|_| fail()),
        SqlColumnType::Float => value
            .replace(',', ".")
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| fail()),
        SqlColumnType::Date => parse_day_first(value)
            .map(|dt| Value::Text(dt.format(DATE_STORAGE_FORMAT).to_string()))
            .ok_or_else(fail),
        SqlColumnType::DateTime => parse_day_first(value)
            .map(|dt| Value::Text(dt.format(DATETIME_STORAGE_FORMAT).to_string()))
            .ok_or_else(fail),
        SqlColumnType::Varchar255 | SqlColumnType::Varchar1024 | SqlColumnType::Text => {
            Ok(Value::Text(value.to_string()))
        }
    }
}
