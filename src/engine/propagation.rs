// ==========================================
// 排班派工系统 - 派工结果传播（后处理）
// ==========================================
// 1. 同组补齐: 按“行号+板号”分组，组内空人员取组内第一个非空人员
// 2. 拆分任务补齐: 拆分任务数据集按去空白行号左连接派工输出，
//    仅填充空人员单元格；同一行号取派工输出中的第一条
// 任一侧列无法识别 → 原样返回
// ==========================================

use crate::common::text::is_missing;
use crate::engine::column_rules::{find_column, ColumnRule, HeaderPattern};
use crate::importer::RawTable;
use std::collections::HashMap;
use tracing::{debug, warn};

const LINE_BOARD_RULES: &[ColumnRule] = &[ColumnRule::new(
    "line_board",
    HeaderPattern::ContainsEach(&[&["ligne", "line"], &["planche", "board"]]),
)];

const LINE_RULES: &[ColumnRule] = &[
    ColumnRule::new(
        "line_board",
        HeaderPattern::ContainsEach(&[&["ligne", "line"], &["planche", "board"]]),
    ),
    ColumnRule::new("line_prefix", HeaderPattern::StartsWith(&["ligne", "line"])),
];

const RESOURCE_RULES: &[ColumnRule] = &[ColumnRule::new(
    "resource_keyword",
    HeaderPattern::Contains(&["ressource", "resource"]),
)];

const ASSIGNED_RULES: &[ColumnRule] = &[ColumnRule::new(
    "assigned_keyword",
    HeaderPattern::Contains(&["ressource_affect"]),
)];

/// 组内补齐空人员
pub fn fill_resource_by_group(table: &RawTable) -> RawTable {
    let mut result = table.clone();
    let (Some(group_col), Some(resource_col)) = (
        find_column(&table.headers, LINE_BOARD_RULES).index(),
        find_column(&table.headers, RESOURCE_RULES).index(),
    ) else {
        warn!("组内补齐: 未识别分组列或人员列，数据保持不变");
        return result;
    };

    let mut first_by_group: HashMap<&str, &str> = HashMap::new();
    for row in 0..table.len() {
        let key = table.cell(row, group_col).trim();
        let resource = table.cell(row, resource_col);
        if is_missing(key) || is_missing(resource) {
            continue;
        }
        first_by_group.entry(key).or_insert(resource);
    }

    let mut filled = 0usize;
    for row in 0..table.len() {
        if !is_missing(table.cell(row, resource_col)) {
            continue;
        }
        let key = table.cell(row, group_col).trim();
        if let Some(resource) = first_by_group.get(key) {
            result.set_cell(row, resource_col, *resource);
            filled += 1;
        }
    }
    debug!(filled, "组内补齐完成");
    result
}

/// 由派工输出补齐拆分任务的人员
///
/// # 参数
/// - splits: 拆分任务数据集
/// - assigned: 派工输出（含结果列）
/// - output_column: 配置的派工结果列名
pub fn fill_splits_from_assignment(
    splits: &RawTable,
    assigned: &RawTable,
    output_column: &str,
) -> RawTable {
    let mut result = splits.clone();

    let split_line = find_column(&splits.headers, LINE_BOARD_RULES).index();
    let split_resource = find_column(&splits.headers, RESOURCE_RULES).index();
    let assigned_line = find_column(&assigned.headers, LINE_RULES).index();
    let assigned_resource = find_column(&assigned.headers, ASSIGNED_RULES)
        .index()
        .or_else(|| assigned.column_index(output_column));

    let (Some(split_line), Some(split_resource), Some(assigned_line), Some(assigned_resource)) =
        (split_line, split_resource, assigned_line, assigned_resource)
    else {
        warn!("拆分任务补齐: 未识别行号列或人员列，数据保持不变");
        return result;
    };

    let mut by_line: HashMap<&str, &str> = HashMap::new();
    for row in 0..assigned.len() {
        let line = assigned.cell(row, assigned_line).trim();
        if line.is_empty() {
            continue;
        }
        by_line
            .entry(line)
            .or_insert_with(|| assigned.cell(row, assigned_resource));
    }

    let mut filled = 0usize;
    for row in 0..splits.len() {
        if !is_missing(splits.cell(row, split_resource)) {
            continue;
        }
        let line = splits.cell(row, split_line).trim();
        match by_line.get(line) {
            Some(resource) if !is_missing(resource) => {
                result.set_cell(row, split_resource, *resource);
                filled += 1;
            }
            _ => {}
        }
    }
    debug!(filled, "拆分任务补齐完成");
    result
}
