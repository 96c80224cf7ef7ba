// ==========================================
// 排班派工系统 - 人员资质索引构建
// ==========================================
// 列识别:
// - 人员列: 表头含 emp / nom / employ，否则第 1 列
// - 资质列: 表头含 comp / qual / certif 且不含 type，否则第 2 列
// 单元格按非字母数字切分为资质代码，同一人员跨行跨列取并集
// ==========================================

use crate::common::text::{extract_codes, is_missing, normalize_resource_name};
use crate::domain::assignment::CompetencyIndex;
use crate::engine::column_rules::{find_column, find_columns, ColumnRule, HeaderPattern};
use crate::importer::RawTable;

const EMPLOYEE_RULES: &[ColumnRule] = &[
    ColumnRule::new("employee_keyword", HeaderPattern::Contains(&["emp", "nom", "employ"])),
    ColumnRule::new("first_column", HeaderPattern::Position(0)),
];

const COMPETENCY_RULES: &[ColumnRule] = &[
    ColumnRule::new(
        "competency_keyword",
        HeaderPattern::ContainsExcluding {
            any: &["comp", "qual", "certif"],
            none: &["type"],
        },
    ),
    ColumnRule::new("second_column", HeaderPattern::Position(1)),
];

/// 由资质数据集构建索引；列无法识别时返回空索引
pub fn build_competency_index(table: &RawTable) -> CompetencyIndex {
    let mut index = CompetencyIndex::new();

    let Some(employee_col) = find_column(&table.headers, EMPLOYEE_RULES).index() else {
        tracing::warn!("资质数据集: 未识别人员列");
        return index;
    };
    let competency_cols = find_columns(&table.headers, COMPETENCY_RULES);
    if competency_cols.is_empty() {
        tracing::warn!("资质数据集: 未识别资质列");
        return index;
    }

    for row in 0..table.len() {
        let raw_name = table.cell(row, employee_col);
        if is_missing(raw_name) {
            continue;
        }
        let name = normalize_resource_name(raw_name);
        for &col in &competency_cols {
            index.add(&name, extract_codes(table.cell(row, col)));
        }
    }

    tracing::debug!(resources = index.len(), "资质索引构建完成");
    index
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
    fn test_union_across_rows_and_columns() {
        let t = table(
            &["Nom", "Compétence 1", "Type compétence", "Qualification"],
            &[
                &["anne  martin", "a1, b2", "interne", ""],
                &["Anne Martin", "c3", "externe", "d4/a1"],
                &["Bob", "", "", "nan"],
            ],
        );
        let index = build_competency_index(&t);

        let codes: Vec<&str> = index
            .codes_of("ANNE MARTIN")
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(codes, vec!["A1", "B2", "C3", "D4"]);
        // 类型列不参与
        assert!(index.holders_of("INTERNE").is_empty());
        // 无资质的人员不登记
        assert!(index.codes_of("BOB").is_none());
    }

    #[test]
    fn test_positional_fallback() {
        let t = table(&["Agent", "Codes"], &[&["Zoé", "X1 X2"]]);
        let index = build_competency_index(&t);
        assert_eq!(index.holders_of("X2"), vec!["ZOÉ"]);
    }

    #[test]
    fn test_single_column_yields_empty_index() {
        let t = table(&["Agent"], &[&["Zoé"]]);
        assert!(build_competency_index(&t).is_empty());
    }
}
