// ==========================================
// 排班派工系统 - 出勤可用性解析
// ==========================================
// 列识别:
// - 日期列: 表头含 date
// - 人员列: 候选列中“含字母取值占比”最高者（前 200 个非空值，同分取最左）
// - 班次列: 表头为 shift / nom shift / nom_shift / vacation，否则含 shift / vacation
// 任一列无法识别 → 空映射（记录告警，不报错）
// ==========================================

use crate::common::dates::parse_task_date;
use crate::common::text::{has_letter, is_missing, normalize_resource_name};
use crate::domain::assignment::ShiftAvailability;
use crate::engine::column_rules::{
    find_all_columns, find_column, pick_best, ColumnRule, HeaderPattern,
};
use crate::importer::RawTable;
use chrono::NaiveDate;

/// 人员列打分采样数
const RESOURCE_SCORE_SAMPLE: usize = 200;

const DATE_RULES: &[ColumnRule] = &[ColumnRule::new("date_keyword", HeaderPattern::Contains(&["date"]))];

const RESOURCE_RULES: &[ColumnRule] = &[
    ColumnRule::new("resource_keyword", HeaderPattern::Contains(&["ressource", "resource"])),
    ColumnRule::new(
        "resource_name",
        HeaderPattern::Exact(&[
            "res",
            "resource",
            "employe",
            "employé",
            "nom",
            "nom prénom",
            "nom_prénom",
        ]),
    ),
];

const SHIFT_RULES: &[ColumnRule] = &[
    ColumnRule::new(
        "shift_name",
        HeaderPattern::Exact(&["shift", "nom shift", "nom_shift", "vacation"]),
    ),
    ColumnRule::new("shift_keyword", HeaderPattern::Contains(&["shift", "vacation"])),
];

// ==========================================
// AvailabilityResolver - 列识别一次，按日期多次解析
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttendanceColumns {
    date: usize,
    resource: usize,
    shift: usize,
}

pub struct AvailabilityResolver<'a> {
    table: &'a RawTable,
    columns: Option<AttendanceColumns>,
    row_dates: Vec<Option<NaiveDate>>,
}

impl<'a> AvailabilityResolver<'a> {
    pub fn new(table: &'a RawTable) -> Self {
        let columns = detect_columns(table);
        let row_dates = match columns {
            Some(c) => table.column_values(c.date).map(parse_task_date).collect(),
            None => Vec::new(),
        };
        Self {
            table,
            columns,
            row_dates,
        }
    }

    /// 必需列是否全部识别
    pub fn is_usable(&self) -> bool {
        self.columns.is_some()
    }

    /// 解析指定日期的 班次 → 人员 映射
    pub fn resolve(&self, date: NaiveDate) -> ShiftAvailability {
        let mut availability = ShiftAvailability::new();
        let Some(columns) = self.columns else {
            return availability;
        };

        for (row, row_date) in self.row_dates.iter().enumerate() {
            if *row_date != Some(date) {
                continue;
            }
            let shift = self.table.cell(row, columns.shift).trim();
            let resource = self.table.cell(row, columns.resource).trim();
            if is_missing(shift) || is_missing(resource) {
                continue;
            }
            availability.add(shift, &normalize_resource_name(resource), resource);
        }
        availability
    }
}

/// 单次解析（出勤数据集 + 目标日期）
pub fn resolve_availability(table: &RawTable, date: NaiveDate) -> ShiftAvailability {
    AvailabilityResolver::new(table).resolve(date)
}

/// 含字母取值占比
fn letter_ratio(table: &RawTable, col: usize) -> f64 {
    let mut total = 0usize;
    let mut with_letter = 0usize;
    for value in table
        .column_values(col)
        .filter(|v| !is_missing(v))
        .take(RESOURCE_SCORE_SAMPLE)
    {
        total += 1;
        if has_letter(value) {
            with_letter += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        with_letter as f64 / total as f64
    }
}

fn detect_columns(table: &RawTable) -> Option<AttendanceColumns> {
    let headers = &table.headers;

    let Some(date) = find_column(headers, DATE_RULES).index() else {
        tracing::warn!("出勤数据集: 未识别日期列");
        return None;
    };

    // 同分取最左：候选按列序号排列
    let mut candidates = find_all_columns(headers, RESOURCE_RULES);
    candidates.sort_unstable();
    let Some(resource) = pick_best(&candidates, |col| letter_ratio(table, col)) else {
        tracing::warn!("出勤数据集: 未识别人员列");
        return None;
    };

    let Some(shift) = find_column(headers, SHIFT_RULES).index() else {
        tracing::warn!("出勤数据集: 未识别班次列");
        return None;
    };

    tracing::debug!(date, resource, shift, "出勤数据集列识别完成");
    Some(AttendanceColumns {
        date,
        resource,
        shift,
    })
}
