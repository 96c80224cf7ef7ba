// ==========================================
// 排班派工系统 - 派工引擎
// ==========================================
// 流程（每次运行）:
// 1. 确定目标日期：显式区间（含首尾，逐日）或任务数据集中的全部日期
// 2. 逐日：出勤可用性 + 当日任务（资质需求 / 班次 / 优先级）
// 3. 当日任务按 (优先级升序, 源行顺序) 稳定排序
// 4. 多轮匹配（至多 max_passes 轮，某轮无新增即停）:
//    候选 = 资质匹配 ∩ 班次出勤，去重保序，剔除当日已达上限者；
//    按 (资质代码序列, 班次) 轮转指针选人
// 5. 结果以原始显示名写回输出列；全部日期完成后统一输出
// 约束:
// - 同一 (人员, 日期) 派工数不超过上限
// - 同一任务行每次运行至多派工一次
// - 轮转指针在整个运行期有效；人员日计数按日重置
// ==========================================

use crate::common::dates::parse_range_bound;
use crate::config::{AssignSettings, ConfigError, FileFormat};
use crate::domain::assignment::{
    AssignmentOutput, AssignmentReport, CompetencyIndex, Requirement,
    RotationKey, ShiftAvailability, TaskAssignment, TaskLine,
};
use crate::engine::availability::AvailabilityResolver;
use crate::engine::competency::build_competency_index;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::output_writer::{write_with_backup, OutputTarget};
use crate::engine::priority::build_priority_table;
use crate::engine::task_lines::TaskExtract;
use crate::importer::{write_delimited, ExtractSource, RawTable, UniversalFileParser};
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 请求与中间结果
// ==========================================

/// 日期区间（边界为 dd/mm/yyyy 或 yyyy-mm-dd 文本）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// 校验并展开区间
    ///
    /// # 返回
    /// - Ok(None): 未指定区间
    /// - Ok(Some(dates)): 含首尾的逐日序列
    /// - Err(Validation): 仅给出一端 / 无法解析 / 起始晚于结束
    pub fn resolve(&self) -> EngineResult<Option<Vec<NaiveDate>>> {
        let start = self.start.as_deref().filter(|s| !s.trim().is_empty());
        let end = self.end.as_deref().filter(|s| !s.trim().is_empty());

        let (start, end) = match (start, end) {
            (None, None) => return Ok(None),
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(EngineError::Validation(
                    "日期区间必须同时给出起止日期".to_string(),
                ))
            }
        };

        let parse = |raw: &str| {
            parse_range_bound(raw)
                .ok_or_else(|| EngineError::Validation(format!("无法解析日期: {}", raw)))
        };
        let start = parse(start)?;
        let end = parse(end)?;
        if start > end {
            return Err(EngineError::Validation(format!(
                "起始日期 {} 晚于结束日期 {}",
                start, end
            )));
        }

        let mut dates = Vec::new();
        let mut cur = start;
        while cur <= end {
            dates.push(cur);
            cur += Duration::days(1);
        }
        Ok(Some(dates))
    }
}

/// 派工运行请求
#[derive(Debug, Clone)]
pub struct AssignmentRequest {
    /// 任务行数据集（必需）
    pub tasks: ExtractSource,
    pub attendance: Option<ExtractSource>,
    pub competencies: Option<ExtractSource>,
    pub priorities: Option<ExtractSource>,
    /// 覆盖配置中的每人每日上限
    pub max_per_resource_per_day: Option<i64>,
    pub range: DateRange,
    pub output: OutputTarget,
}

impl AssignmentRequest {
    pub fn new(tasks: ExtractSource, output: OutputTarget) -> Self {
        Self {
            tasks,
            attendance: None,
            competencies: None,
            priorities: None,
            max_per_resource_per_day: None,
            range: DateRange::default(),
            output,
        }
    }
}

/// 已解析的四个数据集
#[derive(Debug, Clone, Default)]
pub struct AssignmentInputs {
    pub tasks: RawTable,
    pub attendance: Option<RawTable>,
    pub competencies: Option<RawTable>,
    pub priorities: Option<RawTable>,
}

/// 单日匹配结果（人员为规范化名）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayResolution {
    /// (源行号, 规范化人员名)，按派工先后
    pub assignments: Vec<(usize, String)>,
    pub passes: usize,
}

/// 整次运行的计算结果（尚未输出）
#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    pub dates: Vec<NaiveDate>,
    pub table: RawTable,
    pub assignments: Vec<TaskAssignment>,
    pub task_count: usize,
}

// ==========================================
// AssignmentEngine
// ==========================================
pub struct AssignmentEngine {
    settings: AssignSettings,
}

impl AssignmentEngine {
    /// 创建引擎（上限必须为正）
    pub fn new(settings: AssignSettings) -> EngineResult<Self> {
        settings.validate().map_err(validation_error)?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &AssignSettings {
        &self.settings
    }

    pub fn cap(&self) -> i64 {
        self.settings.max_per_resource_per_day
    }

    /// 候选人员（资质匹配 ∩ 出勤，去重保序，未扣除上限）
    pub fn candidates_for(
        task: &TaskLine,
        availability: &ShiftAvailability,
        competencies: &CompetencyIndex,
    ) -> Vec<String> {
        let qualified: Vec<String> = match &task.requirement {
            Requirement::AllOf(required) => competencies
                .holders_of_all(required)
                .into_iter()
                .map(str::to_string)
                .collect(),
            Requirement::Single(code) => competencies
                .holders_of(code)
                .into_iter()
                .map(str::to_string)
                .collect(),
            Requirement::Unrestricted => return availability.pool_for(&task.shift),
        };

        let mut seen = HashSet::new();
        qualified
            .into_iter()
            .filter(|r| availability.is_available(&task.shift, r))
            .filter(|r| seen.insert(r.clone()))
            .collect()
    }

    /// 单日匹配
    ///
    /// # 参数
    /// - tasks: 当日任务（任意顺序，内部稳定排序）
    /// - pointers: 轮转指针（跨日期共享）
    pub fn resolve_day(
        &self,
        tasks: &[TaskLine],
        availability: &ShiftAvailability,
        competencies: &CompetencyIndex,
        pointers: &mut HashMap<RotationKey, usize>,
    ) -> DayResolution {
        let mut ordered: Vec<&TaskLine> = tasks.iter().collect();
        ordered.sort_by_key(|t| (t.priority, t.row_index));

        let cap = self.cap();
        let mut counts: HashMap<String, i64> = HashMap::new();
        let mut assigned: HashSet<usize> = HashSet::new();
        let mut resolution = DayResolution::default();

        // 轮次之间候选集合不变（上限不会释放），后续轮次通常不再新增
        while resolution.passes < self.settings.max_passes {
            resolution.passes += 1;
            let mut progress = false;

            for task in &ordered {
                if assigned.contains(&task.row_index) {
                    continue;
                }
                let candidates: Vec<String> = Self::candidates_for(task, availability, competencies)
                    .into_iter()
                    .filter(|r| counts.get(r).copied().unwrap_or(0) < cap)
                    .collect();
                if candidates.is_empty() {
                    continue;
                }

                let pointer = pointers.entry(task.rotation_key()).or_insert(0);
                let chosen = candidates[*pointer % candidates.len()].clone();
                *pointer = (*pointer + 1) % candidates.len();

                *counts.entry(chosen.clone()).or_insert(0) += 1;
                assigned.insert(task.row_index);
                resolution.assignments.push((task.row_index, chosen));
                progress = true;
            }

            if !progress {
                break;
            }
        }
        resolution
    }

    /// 在已解析的数据集上完成整次派工（不输出）
    ///
    /// # 返回
    /// - Err(Configuration): 任务数据集缺少日期列，或未指定区间且无可识别日期
    pub fn assign_tables(
        &self,
        inputs: &AssignmentInputs,
        range: &DateRange,
    ) -> EngineResult<AssignmentOutcome> {
        let explicit_dates = range.resolve()?;
        let extract = TaskExtract::new(&inputs.tasks)?;

        let dates = match explicit_dates {
            Some(dates) => dates,
            None => {
                let dates = extract.distinct_dates();
                if dates.is_empty() {
                    return Err(EngineError::Configuration(
                        "任务数据集中无法识别任何日期".to_string(),
                    ));
                }
                dates
            }
        };

        let competencies = inputs
            .competencies
            .as_ref()
            .map(build_competency_index)
            .unwrap_or_default();
        let priorities = inputs
            .priorities
            .as_ref()
            .map(build_priority_table)
            .unwrap_or_default();
        let empty_attendance = RawTable::default();
        let availability =
            AvailabilityResolver::new(inputs.attendance.as_ref().unwrap_or(&empty_attendance));

        let mut table = inputs.tasks.clone();
        let output_col = table.ensure_column(&self.settings.output_column);

        let mut pointers: HashMap<RotationKey, usize> = HashMap::new();
        let mut assignments = Vec::new();
        let mut task_count = 0;

        for date in &dates {
            let day_availability = availability.resolve(*date);
            let tasks = extract.tasks_for(*date, &priorities);
            task_count += tasks.len();
            if tasks.is_empty() {
                continue;
            }

            let resolution =
                self.resolve_day(&tasks, &day_availability, &competencies, &mut pointers);
            debug!(
                date = %date,
                tasks = tasks.len(),
                assigned = resolution.assignments.len(),
                passes = resolution.passes,
                "单日派工完成"
            );

            for (row_index, resource) in resolution.assignments {
                let display = day_availability.display_name(&resource).to_string();
                table.set_cell(row_index, output_col, display.clone());
                assignments.push(TaskAssignment {
                    row_index,
                    date: *date,
                    resource: display,
                });
            }
        }

        Ok(AssignmentOutcome {
            dates,
            table,
            assignments,
            task_count,
        })
    }

    /// 完整运行：读取数据集 → 派工 → 输出
    #[instrument(skip(self, request), fields(run_id))]
    pub fn run(&self, request: &AssignmentRequest) -> EngineResult<AssignmentReport> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        // === 步骤 1: 运行前校验 ===
        let engine = match request.max_per_resource_per_day {
            Some(cap) => AssignmentEngine::new(self.settings.clone().with_cap(cap))?,
            None => AssignmentEngine::new(self.settings.clone())?,
        };
        request.range.resolve()?;

        // === 步骤 2: 读取数据集 ===
        let parser = UniversalFileParser::new(engine.settings.format);
        let inputs = AssignmentInputs {
            tasks: parser.parse_source(&request.tasks)?,
            attendance: load_optional(&parser, "attendance", request.attendance.as_ref()),
            competencies: load_optional(&parser, "competencies", request.competencies.as_ref()),
            priorities: load_optional(&parser, "priorities", request.priorities.as_ref()),
        };

        // === 步骤 3: 派工 ===
        let outcome = engine.assign_tables(&inputs, &request.range)?;

        // === 步骤 4: 输出 ===
        let bytes = encode_output(&outcome.table, &engine.settings.format)?;
        let output = match &request.output {
            OutputTarget::Bytes => AssignmentOutput::Bytes(bytes),
            OutputTarget::File(path) => {
                let backup =
                    write_with_backup(path, &bytes, &engine.settings.backup_timestamp_format)?;
                AssignmentOutput::File {
                    path: path.clone(),
                    backup,
                }
            }
        };

        let assigned = outcome.assignments.len();
        let unassigned = outcome.task_count - assigned;
        info!(
            run_id = %run_id,
            dates = outcome.dates.len(),
            assigned,
            unassigned,
            "派工运行完成"
        );

        Ok(AssignmentReport {
            run_id,
            dates: outcome.dates,
            assignments: outcome.assignments,
            assigned,
            unassigned,
            output,
        })
    }
}

fn validation_error(err: ConfigError) -> EngineError {
    EngineError::Validation(err.to_string())
}

fn encode_output(table: &RawTable, format: &FileFormat) -> EngineResult<Vec<u8>> {
    Ok(write_delimited(table, format)?)
}

/// 读取可选数据集；缺失或无法解析时记录告警并返回 None
fn load_optional(
    parser: &UniversalFileParser,
    dataset: &str,
    source: Option<&ExtractSource>,
) -> Option<RawTable> {
    let result = match source {
        None => Err(EngineError::PartialData {
            dataset: dataset.to_string(),
            message: "未提供".to_string(),
        }),
        Some(source) => parser.parse_source(source).map_err(|e| EngineError::PartialData {
            dataset: dataset.to_string(),
            message: e.to_string(),
        }),
    };

    match result {
        Ok(table) => Some(table),
        Err(e) => {
            warn!(error = %e, "可选数据集不可用，按空数据继续");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(row: usize, codes: &[&str], shift: &str, priority: i64) -> TaskLine {
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        TaskLine {
            row_index: row,
            date: ymd(2025, 2, 3),
            requirement: Requirement::from_codes(&codes),
            codes,
            shift: shift.to_string(),
            priority,
        }
    }

    fn engine(cap: i64) -> AssignmentEngine {
        AssignmentEngine::new(AssignSettings::default().with_cap(cap)).unwrap()
    }

    fn availability(shift: &str, names: &[&str]) -> ShiftAvailability {
        let mut a = ShiftAvailability::new();
        for n in names {
            a.add(shift, n, n);
        }
        a
    }

    fn competencies(entries: &[(&str, &[&str])]) -> CompetencyIndex {
        let mut idx = CompetencyIndex::new();
        for (name, codes) in entries {
            idx.add(name, codes.iter().map(|c| c.to_string()));
        }
        idx
    }

    #[test]
    fn test_scenario_a_two_tasks_two_resources() {
        let tasks = vec![task(1, &["A"], "S1", 999), task(2, &["A"], "S1", 999)];
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"])]);
        let avail = availability("S1", &["R1", "R2"]);

        let day = engine(1).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert_eq!(
            day.assignments,
            vec![(1, "R1".to_string()), (2, "R2".to_string())]
        );
    }

    #[test]
    fn test_scenario_b_single_resource_respects_cap() {
        let tasks = vec![task(1, &["A"], "S1", 999), task(2, &["A"], "S1", 999)];
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"])]);
        let avail = availability("S1", &["R1"]);

        let day = engine(1).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments, vec![(1, "R1".to_string())]);
        // 第二轮无新增即停止
        assert_eq!(day.passes, 2);
    }

    #[test]
    fn test_scenario_d_all_of_requires_superset() {
        let tasks = vec![task(1, &["A", "B"], "S1", 999)];
        let comp = competencies(&[("ONLY_A", &["A"]), ("ABC", &["A", "B", "C"])]);
        let avail = availability("S1", &["ONLY_A", "ABC"]);

        let day = engine(1).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments, vec![(1, "ABC".to_string())]);
    }

    #[test]
    fn test_priority_order_consumes_pointer_first() {
        // 行 1 优先级低（数值大），行 2 优先级高
        let tasks = vec![task(1, &["A"], "S1", 5), task(2, &["A"], "S1", 1)];
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"])]);
        let avail = availability("S1", &["R1", "R2"]);

        let day = engine(1).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments[0], (2, "R1".to_string()));
        assert_eq!(day.assignments[1], (1, "R2".to_string()));
    }

    #[test]
    fn test_round_robin_cycles_through_candidates() {
        let tasks: Vec<TaskLine> = (0..6).map(|i| task(i, &["A"], "S1", 999)).collect();
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"]), ("R3", &["A"])]);
        let avail = availability("S1", &["R1", "R2", "R3"]);

        let day = engine(10).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        let order: Vec<&str> = day.assignments.iter().map(|(_, r)| r.as_str()).collect();
        assert_eq!(order, vec!["R1", "R2", "R3", "R1", "R2", "R3"]);
    }

    #[test]
    fn test_pointer_persists_across_days() {
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"])]);
        let avail = availability("S1", &["R1", "R2"]);
        let mut pointers = HashMap::new();
        let e = engine(1);

        let day1 = e.resolve_day(&[task(1, &["A"], "S1", 999)], &avail, &comp, &mut pointers);
        let day2 = e.resolve_day(&[task(2, &["A"], "S1", 999)], &avail, &comp, &mut pointers);
        assert_eq!(day1.assignments[0].1, "R1");
        assert_eq!(day2.assignments[0].1, "R2");
    }

    #[test]
    fn test_unrestricted_task_uses_shift_pool_and_fallback() {
        let comp = CompetencyIndex::new();
        let mut avail = availability("S1", &["R1"]);
        avail.add("S2", "R2", "R2");

        // 指定班次存在
        let in_s2 = vec![task(1, &[], "S2", 999)];
        let day = engine(1).resolve_day(&in_s2, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments, vec![(1, "R2".to_string())]);

        // 指定班次当日不存在 → 任一班次
        let unknown = vec![task(2, &[], "S9", 999)];
        let day = engine(1).resolve_day(&unknown, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments, vec![(2, "R1".to_string())]);
    }

    #[test]
    fn test_unavailable_or_unqualified_stay_unassigned() {
        let tasks = vec![task(1, &["Z"], "S1", 999)];
        let comp = competencies(&[("R1", &["A"])]);
        let avail = availability("S1", &["R1"]);
        let day = engine(1).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert!(day.assignments.is_empty());
        assert_eq!(day.passes, 1);
    }

    #[test]
    fn test_cap_and_no_double_assignment_hold() {
        let tasks: Vec<TaskLine> = (0..10).map(|i| task(i, &["A"], "", 999)).collect();
        let comp = competencies(&[("R1", &["A"]), ("R2", &["A"]), ("R3", &["A"])]);
        let avail = availability("S1", &["R1", "R2", "R3"]);

        let day = engine(2).resolve_day(&tasks, &avail, &comp, &mut HashMap::new());
        assert_eq!(day.assignments.len(), 6);

        let mut per_resource: HashMap<&str, i64> = HashMap::new();
        let mut rows = BTreeSet::new();
        for (row, r) in &day.assignments {
            *per_resource.entry(r.as_str()).or_insert(0) += 1;
            assert!(rows.insert(*row));
        }
        assert!(per_resource.values().all(|&n| n <= 2));
    }

    #[test]
    fn test_engine_rejects_non_positive_cap() {
        assert!(matches!(
            AssignmentEngine::new(AssignSettings::default().with_cap(0)),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            AssignmentEngine::new(AssignSettings::default().with_cap(-3)),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_date_range_validation() {
        assert_eq!(DateRange::default().resolve().unwrap(), None);
        assert_eq!(
            DateRange::new("03/02/2025", "2025-02-05").resolve().unwrap(),
            Some(vec![ymd(2025, 2, 3), ymd(2025, 2, 4), ymd(2025, 2, 5)])
        );

        let one_sided = DateRange {
            start: Some("03/02/2025".to_string()),
            end: None,
        };
        assert!(matches!(one_sided.resolve(), Err(EngineError::Validation(_))));
        assert!(matches!(
            DateRange::new("demain", "03/02/2025").resolve(),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            DateRange::new("05/02/2025", "03/02/2025").resolve(),
            Err(EngineError::Validation(_))
        ));
    }
}
