// ==========================================
// 排班派工系统 - 启发式列识别
// ==========================================
// 规则表: 有序 (规则名, 表头模式) 列表，先命中的规则生效
// 同一规则命中多列时取最左列
// 结果显式区分 Found / NoMatch
// ==========================================

/// 表头模式（比较前表头去首尾空白并转小写）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPattern {
    /// 表头完全等于其中之一
    Exact(&'static [&'static str]),
    /// 表头包含其中之一
    Contains(&'static [&'static str]),
    /// 表头以其中之一开头
    StartsWith(&'static [&'static str]),
    /// 表头包含 any 之一，且不包含 none 中任何一个
    ContainsExcluding {
        any: &'static [&'static str],
        none: &'static [&'static str],
    },
    /// 表头对每一组都至少包含其中之一
    ContainsEach(&'static [&'static [&'static str]]),
    /// 按位置回退（第 n 列，0 起）
    Position(usize),
}

impl HeaderPattern {
    pub fn matches(&self, header: &str, index: usize) -> bool {
        let h = header.trim().to_lowercase();
        match self {
            HeaderPattern::Exact(names) => names.iter().any(|n| h == *n),
            HeaderPattern::Contains(parts) => parts.iter().any(|p| h.contains(p)),
            HeaderPattern::StartsWith(prefixes) => prefixes.iter().any(|p| h.starts_with(p)),
            HeaderPattern::ContainsExcluding { any, none } => {
                any.iter().any(|p| h.contains(p)) && !none.iter().any(|p| h.contains(p))
            }
            HeaderPattern::ContainsEach(groups) => groups
                .iter()
                .all(|group| group.iter().any(|p| h.contains(p))),
            HeaderPattern::Position(n) => index == *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub name: &'static str,
    pub pattern: HeaderPattern,
}

impl ColumnRule {
    pub const fn new(name: &'static str, pattern: HeaderPattern) -> Self {
        Self { name, pattern }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    Found { index: usize, rule: &'static str },
    NoMatch,
}

impl ColumnMatch {
    pub fn index(&self) -> Option<usize> {
        match self {
            ColumnMatch::Found { index, .. } => Some(*index),
            ColumnMatch::NoMatch => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ColumnMatch::Found { .. })
    }
}

fn matching_indices(headers: &[String], pattern: &HeaderPattern) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(idx, h)| pattern.matches(h, *idx))
        .map(|(idx, _)| idx)
        .collect()
}

/// 单列识别：第一条命中的规则的最左列
pub fn find_column(headers: &[String], rules: &[ColumnRule]) -> ColumnMatch {
    for rule in rules {
        if let Some(&index) = matching_indices(headers, &rule.pattern).first() {
            return ColumnMatch::Found {
                index,
                rule: rule.name,
            };
        }
    }
    ColumnMatch::NoMatch
}

/// 多列识别：第一条命中的规则的全部列（从左到右）
pub fn find_columns(headers: &[String], rules: &[ColumnRule]) -> Vec<usize> {
    for rule in rules {
        let indices = matching_indices(headers, &rule.pattern);
        if !indices.is_empty() {
            return indices;
        }
    }
    Vec::new()
}

/// 全部规则命中的列：按规则顺序、规则内从左到右，去重
pub fn find_all_columns(headers: &[String], rules: &[ColumnRule]) -> Vec<usize> {
    let mut result: Vec<usize> = Vec::new();
    for rule in rules {
        for idx in matching_indices(headers, &rule.pattern) {
            if !result.contains(&idx) {
                result.push(idx);
            }
        }
    }
    result
}

/// 打分选列：得分最高者胜，同分取最左
pub fn pick_best<F>(candidates: &[usize], mut score: F) -> Option<usize>
where
    F: FnMut(usize) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for &idx in candidates {
        let s = score(idx);
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((idx, s)),
        }
    }
    best.map(|(idx, _)| idx)
}
