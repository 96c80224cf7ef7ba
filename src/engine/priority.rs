// ==========================================
// 排班派工系统 - 资质优先级表构建
// ==========================================
// 代码列: 表头含 nom / code / comp；数值列: 表头含 prior / val / niveau / rank
// 任一列无法识别时整体回退为第 1、2 列
// 数值先按整数解析，失败再按小数截断；都失败则跳过该行
// ==========================================

use crate::common::text::is_missing;
use crate::domain::assignment::PriorityTable;
use crate::engine::column_rules::{find_column, ColumnRule, HeaderPattern};
use crate::importer::RawTable;

const CODE_RULES: &[ColumnRule] = &[ColumnRule::new(
    "code_keyword",
    HeaderPattern::Contains(&["nom", "code", "comp"]),
)];

const VALUE_RULES: &[ColumnRule] = &[ColumnRule::new(
    "value_keyword",
    HeaderPattern::Contains(&["prior", "val", "niveau", "rank"]),
)];

/// 解析优先级数值
pub fn parse_rank(value: &str) -> Option<i64> {
    let v = value.trim();
    if let Ok(n) = v.parse::<i64>() {
        return Some(n);
    }
    let f = v.replace(',', ".").parse::<f64>().ok()?;
    if f.is_finite() {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

pub fn build_priority_table(table: &RawTable) -> PriorityTable {
    let mut priorities = PriorityTable::new();

    let columns = match (
        find_column(&table.headers, CODE_RULES).index(),
        find_column(&table.headers, VALUE_RULES).index(),
    ) {
        (Some(code), Some(value)) => Some((code, value)),
        _ if table.width() >= 2 => Some((0, 1)),
        _ => None,
    };
    let Some((code_col, value_col)) = columns else {
        tracing::warn!("优先级数据集: 列数不足，无法识别代码/数值列");
        return priorities;
    };

    for row in 0..table.len() {
        let code = table.cell(row, code_col).trim().to_uppercase();
        let raw_value = table.cell(row, value_col);
        if code.is_empty() || is_missing(raw_value) {
            continue;
        }
        match parse_rank(raw_value) {
            Some(rank) => priorities.insert(code, rank),
            None => tracing::debug!(row, value = raw_value, "优先级数值无法解析，跳过"),
        }
    }

    priorities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_parse_rank() {
        assert_eq!(parse_rank(" 3 "), Some(3));
        assert_eq!(parse_rank("2.9"), Some(2));
        assert_eq!(parse_rank("4,5"), Some(4));
        assert_eq!(parse_rank("haute"), None);
    }

    #[test]
    fn test_keyword_columns() {
        let t = table(
            &["Commentaire", "Priorité", "Code"],
            &[&["x", "2", " a1 "], &["y", "n/a", "B2"], &["z", "1.0", "c3"]],
        );
        let p = build_priority_table(&t);
        assert_eq!(p.get("A1"), Some(2));
        assert_eq!(p.get("B2"), None);
        assert_eq!(p.get("C3"), Some(1));
    }

    #[test]
    fn test_positional_fallback() {
        let t = table(&["K", "V"], &[&["a1", "5"]]);
        assert_eq!(build_priority_table(&t).get("A1"), Some(5));
    }
}
