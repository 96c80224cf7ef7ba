// ==========================================
// 排班派工系统 - 列类型推断
// ==========================================
// 判定顺序: 整数 → 小数 → 日期/日期时间 → 字符串（按最大长度分档）
// 采样: 每列最多 sample_limit 个非空值（去首尾空白）
// ==========================================

use crate::common::dates::parse_day_first;
use crate::domain::types::SqlColumnType;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("INTEGER_RE 正则无效"));

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+([.,][0-9]*)?|[.,][0-9]+)([eE][+-]?[0-9]+)?$")
        .expect("FLOAT_RE 正则无效")
});

/// 整数判定（须落在 BIGINT 范围内）
pub fn is_integer_literal(value: &str) -> bool {
    INTEGER_RE.is_match(value) && value.parse::<i64>().is_ok()
}

/// 小数判定（逗号或点作小数分隔符）
///
/// 超出 BIGINT 范围的纯数字串视为标识符，不作小数处理
pub fn is_float_literal(value: &str) -> bool {
    FLOAT_RE.is_match(value) && (is_integer_literal(value) || !INTEGER_RE.is_match(value))
}

// ==========================================
// TypeInferencer
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct TypeInferencer {
    sample_limit: usize,
}

impl TypeInferencer {
    pub fn new(sample_limit: usize) -> Self {
        Self {
            sample_limit: sample_limit.max(1),
        }
    }

    /// 推断单列类型
    ///
    /// # 参数
    /// - values: 该列全部单元格（按行顺序）
    pub fn infer<'a, I>(&self, values: I) -> SqlColumnType
    where
        I: IntoIterator<Item = &'a str>,
    {
        let sample: Vec<&str> = values
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .take(self.sample_limit)
            .collect();

        if sample.is_empty() {
            return SqlColumnType::Varchar255;
        }
        if sample.iter().all(|v| is_integer_literal(v)) {
            return SqlColumnType::Integer;
        }
        if sample.iter().all(|v| is_float_literal(v)) {
            return SqlColumnType::Float;
        }

        let parsed: Option<Vec<_>> = sample.iter().map(|v| parse_day_first(v)).collect();
        if let Some(datetimes) = parsed {
            let has_time = datetimes.iter().any(|dt| dt.time() != NaiveTime::MIN);
            return if has_time {
                SqlColumnType::DateTime
            } else {
                SqlColumnType::Date
            };
        }

        let max_len = sample.iter().map(|v| v.chars().count()).max().unwrap_or(0);
        SqlColumnType::string_tier(max_len)
    }
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new(crate::config::settings::DEFAULT_SAMPLE_LIMIT)
    }
}
