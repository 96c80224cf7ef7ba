// ==========================================
// 排班派工系统 - 派工领域对象
// ==========================================
// 职责: 任务行 / 资质需求 / 班次可用性 / 资质索引 / 优先级表
// 约定: 人员名一律使用规范化形式（折叠空白 + 大写）作为键
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

/// 未登记优先级的哨兵值（越小越紧急）
pub const UNRANKED_PRIORITY: i64 = 999;

// ==========================================
// Requirement - 任务资质需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// 未声明资质：任何可用人员
    Unrestricted,
    /// 单一资质（ANY-of-one）
    Single(String),
    /// 多资质（ALL-of-many）：人员资质集合必须为其超集
    AllOf(BTreeSet<String>),
}

impl Requirement {
    /// 由任务上识别出的资质代码构造需求
    ///
    /// # 规则
    /// - 去重后 0 个 → Unrestricted
    /// - 去重后 1 个 → Single
    /// - 去重后 ≥2 个 → AllOf（不折叠为单一代码）
    pub fn from_codes(codes: &[String]) -> Self {
        let distinct: BTreeSet<String> = codes.iter().cloned().collect();
        match distinct.len() {
            0 => Requirement::Unrestricted,
            1 => Requirement::Single(distinct.into_iter().next().unwrap_or_default()),
            _ => Requirement::AllOf(distinct),
        }
    }

    /// 轮转指针键的资质部分（排序后的代码序列）
    pub fn rotation_codes(&self) -> Vec<String> {
        match self {
            Requirement::Unrestricted => Vec::new(),
            Requirement::Single(code) => vec![code.clone()],
            Requirement::AllOf(codes) => codes.iter().cloned().collect(),
        }
    }

    pub fn is_all_of(&self) -> bool {
        matches!(self, Requirement::AllOf(_))
    }
}

/// 轮转指针键: (排序后的资质代码, 班次)
pub type RotationKey = (Vec<String>, String);

// ==========================================
// TaskLine - 单日任务行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLine {
    pub row_index: usize, // 源文件数据行序号（0 起）
    pub date: NaiveDate,
    pub codes: Vec<String>, // 识别出的全部资质代码（含重复，按列顺序累积）
    pub requirement: Requirement,
    pub shift: String, // 空串表示未指定
    pub priority: i64,
}

impl TaskLine {
    pub fn rotation_key(&self) -> RotationKey {
        (self.requirement.rotation_codes(), self.shift.clone())
    }
}

// ==========================================
// ShiftAvailability - 单日班次可用人员
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftAvailability {
    shift_order: Vec<String>,
    by_shift: HashMap<String, Vec<String>>,
    display_names: HashMap<String, String>,
}

impl ShiftAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记某班次的一名人员（班次内去重、保序；显示名首见为准）
    pub fn add(&mut self, shift: &str, normalized: &str, display: &str) {
        if shift.is_empty() || normalized.is_empty() {
            return;
        }
        self.display_names
            .entry(normalized.to_string())
            .or_insert_with(|| display.to_string());

        if !self.by_shift.contains_key(shift) {
            self.shift_order.push(shift.to_string());
        }
        let list = self.by_shift.entry(shift.to_string()).or_default();
        if !list.iter().any(|r| r == normalized) {
            list.push(normalized.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_shift.is_empty()
    }

    pub fn shifts(&self) -> &[String] {
        &self.shift_order
    }

    pub fn has_shift(&self, shift: &str) -> bool {
        self.by_shift.contains_key(shift)
    }

    pub fn resources_in(&self, shift: &str) -> &[String] {
        self.by_shift.get(shift).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 判断人员在指定班次（若该班次存在）或任一班次中出勤
    ///
    /// 指定班次当日无人出勤时回退为“任一班次”
    pub fn is_available(&self, shift: &str, normalized: &str) -> bool {
        if !shift.is_empty() && self.has_shift(shift) {
            self.resources_in(shift).iter().any(|r| r == normalized)
        } else {
            self.by_shift
                .values()
                .any(|list| list.iter().any(|r| r == normalized))
        }
    }

    /// 指定班次（或回退到全部班次）的出勤人员，按班次顺序去重
    pub fn pool_for(&self, shift: &str) -> Vec<String> {
        if !shift.is_empty() && self.has_shift(shift) {
            return self.resources_in(shift).to_vec();
        }
        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for s in &self.shift_order {
            for r in self.resources_in(s) {
                if seen.insert(r.as_str()) {
                    pool.push(r.clone());
                }
            }
        }
        pool
    }

    /// 规范化名 → 原始显示名（未登记时原样返回）
    pub fn display_name<'a>(&'a self, normalized: &'a str) -> &'a str {
        self.display_names
            .get(normalized)
            .map(String::as_str)
            .unwrap_or(normalized)
    }

    pub fn display_names(&self) -> &HashMap<String, String> {
        &self.display_names
    }
}

// ==========================================
// CompetencyIndex - 人员资质索引
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetencyIndex {
    order: Vec<String>,
    codes: HashMap<String, BTreeSet<String>>,
}

impl CompetencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并人员资质（同一人员多行/多列取并集）
    pub fn add<I, S>(&mut self, normalized: &str, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut incoming = codes.into_iter().map(Into::into).peekable();
        if normalized.is_empty() || incoming.peek().is_none() {
            return;
        }
        if !self.codes.contains_key(normalized) {
            self.order.push(normalized.to_string());
        }
        self.codes
            .entry(normalized.to_string())
            .or_default()
            .extend(incoming);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按登记顺序遍历人员
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn codes_of(&self, normalized: &str) -> Option<&BTreeSet<String>> {
        self.codes.get(normalized)
    }

    /// 持有某资质的人员（按登记顺序）
    pub fn holders_of(&self, code: &str) -> Vec<&str> {
        self.resources()
            .filter(|r| self.codes.get(*r).is_some_and(|set| set.contains(code)))
            .collect()
    }

    /// 资质集合为 required 超集的人员（按登记顺序）
    pub fn holders_of_all(&self, required: &BTreeSet<String>) -> Vec<&str> {
        self.resources()
            .filter(|r| {
                self.codes
                    .get(*r)
                    .is_some_and(|set| required.is_subset(set))
            })
            .collect()
    }
}

// ==========================================
// PriorityTable - 资质代码优先级
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTable {
    ranks: HashMap<String, i64>,
}

impl PriorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, rank: i64) {
        self.ranks.insert(code.into(), rank);
    }

    pub fn get(&self, code: &str) -> Option<i64> {
        self.ranks.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// 已登记代码中的最小优先级；均未登记时为 999
    pub fn min_rank<'a, I>(&self, codes: I) -> i64
    where
        I: IntoIterator<Item = &'a String>,
    {
        codes
            .into_iter()
            .filter_map(|c| self.get(c))
            .min()
            .unwrap_or(UNRANKED_PRIORITY)
    }
}

// ==========================================
// 派工结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub row_index: usize,
    pub date: NaiveDate,
    pub resource: String, // 原始显示名
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOutput {
    /// 已写入文件；backup 为覆盖前旧输出的备份路径
    File {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// 编码后的 CSV 内容（无落盘副作用）
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub run_id: String,
    pub dates: Vec<NaiveDate>,
    pub assignments: Vec<TaskAssignment>,
    pub assigned: usize,
    pub unassigned: usize,
    pub output: AssignmentOutput,
}
