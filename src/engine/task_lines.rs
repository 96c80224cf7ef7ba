// ==========================================
// 排班派工系统 - 任务行数据集
// ==========================================
// 列识别:
// - 日期列（必需）: 表头为 jour / date，否则含 date / jour；缺失为致命错误
// - 资质列: 表头以 qualif / compet 开头（可多列，代码累积）
// - 班次列: 表头为 vacation / shift / nom shift / nom_shift，其次含 vac / shift；
//           取第一个非空值
// ==========================================

use crate::common::dates::parse_task_date;
use crate::common::text::{extract_codes, is_missing};
use crate::domain::assignment::{PriorityTable, Requirement, TaskLine};
use crate::engine::column_rules::{find_all_columns, find_column, ColumnRule, HeaderPattern};
use crate::engine::error::{EngineError, EngineResult};
use crate::importer::RawTable;
use chrono::NaiveDate;
use std::collections::BTreeSet;

const DATE_RULES: &[ColumnRule] = &[
    ColumnRule::new("date_name", HeaderPattern::Exact(&["jour", "date"])),
    ColumnRule::new("date_keyword", HeaderPattern::Contains(&["date", "jour"])),
];

const QUALIFICATION_RULES: &[ColumnRule] = &[ColumnRule::new(
    "qualification_prefix",
    HeaderPattern::StartsWith(&["qualif", "compet"]),
)];

// 精确名按 Vacation → Shift → Nom Shift 的优先顺序
const SHIFT_RULES: &[ColumnRule] = &[
    ColumnRule::new("vacation_name", HeaderPattern::Exact(&["vacation"])),
    ColumnRule::new("shift_name", HeaderPattern::Exact(&["shift"])),
    ColumnRule::new("nom_shift_name", HeaderPattern::Exact(&["nom shift", "nom_shift"])),
    ColumnRule::new("shift_keyword", HeaderPattern::Contains(&["vac", "shift"])),
];

// ==========================================
// TaskExtract - 已识别列的任务数据集
// ==========================================
pub struct TaskExtract<'a> {
    table: &'a RawTable,
    qualification_cols: Vec<usize>,
    shift_cols: Vec<usize>,
    row_dates: Vec<Option<NaiveDate>>,
}

impl<'a> TaskExtract<'a> {
    /// 识别列并解析每行日期
    ///
    /// # 返回
    /// - Err(Configuration): 缺少日期列
    pub fn new(table: &'a RawTable) -> EngineResult<Self> {
        let date_col = find_column(&table.headers, DATE_RULES).index().ok_or_else(|| {
            EngineError::Configuration("任务数据集缺少日期列 (Jour/Date)".to_string())
        })?;

        let qualification_cols = find_all_columns(&table.headers, QUALIFICATION_RULES);
        let shift_cols = find_all_columns(&table.headers, SHIFT_RULES);
        if qualification_cols.is_empty() {
            tracing::warn!("任务数据集: 未识别资质列，所有任务视为无资质要求");
        }

        let row_dates = table.column_values(date_col).map(parse_task_date).collect();

        Ok(Self {
            table,
            qualification_cols,
            shift_cols,
            row_dates,
        })
    }

    pub fn table(&self) -> &RawTable {
        self.table
    }

    pub fn row_date(&self, row: usize) -> Option<NaiveDate> {
        self.row_dates.get(row).copied().flatten()
    }

    /// 数据集中出现的全部日期（去重升序；无法解析的单元格不计入）
    pub fn distinct_dates(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.row_dates.iter().flatten().copied().collect();
        set.into_iter().collect()
    }

    /// 某行的资质代码（按列顺序累积，保留重复）
    pub fn codes_of(&self, row: usize) -> Vec<String> {
        self.qualification_cols
            .iter()
            .flat_map(|&col| extract_codes(self.table.cell(row, col)))
            .collect()
    }

    /// 某行的班次（第一个非空的班次类列值）
    pub fn shift_of(&self, row: usize) -> String {
        self.shift_cols
            .iter()
            .map(|&col| self.table.cell(row, col).trim())
            .find(|v| !is_missing(v))
            .unwrap_or("")
            .to_string()
    }

    /// 构建某日的任务列表（按源行顺序）
    pub fn tasks_for(&self, date: NaiveDate, priorities: &PriorityTable) -> Vec<TaskLine> {
        self.row_dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == Some(date))
            .map(|(row, _)| {
                let codes = self.codes_of(row);
                TaskLine {
                    row_index: row,
                    date,
                    requirement: Requirement::from_codes(&codes),
                    priority: priorities.min_rank(codes.iter()),
                    shift: self.shift_of(row),
                    codes,
                }
            })
            .collect()
    }
}
