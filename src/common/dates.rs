// ==========================================
// 排班派工系统 - 日期解析（日在前）
// ==========================================
// 源数据日期一律按“日/月/年”理解；ISO 写法（年-月-日）同样接受
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// 单元格中任意位置的 dd/mm/yyyy 片段
static DMY_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("DMY_FRAGMENT 正则无效")
});

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%y", "%d-%m-%y",
];

/// 日在前的日期/时间解析
///
/// # 返回
/// - Some(NaiveDateTime): 解析成功（纯日期时时间为 00:00:00）
/// - None: 无法识别
pub fn parse_day_first(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    if s.is_empty() || !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    // 纯数字不视为日期（由整数判定处理）
    let unsigned = s.trim_start_matches(|c: char| c == '+' || c == '-');
    if unsigned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    None
}

/// 任务行日期解析
///
/// 先在单元格任意位置查找 dd/mm/yyyy 片段（例如 "lundi 03/02/2025"），
/// 找不到再整体按日在前解析。
pub fn parse_task_date(value: &str) -> Option<NaiveDate> {
    if let Some(caps) = DMY_FRAGMENT.captures(value) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        // 片段存在但日期非法时不再尝试其他写法
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    parse_day_first(value).map(|dt| dt.date())
}

/// 派工区间边界解析（dd/mm/yyyy 或 ISO yyyy-mm-dd）
pub fn parse_range_bound(value: &str) -> Option<NaiveDate> {
    let s = value.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_day_first_variants() {
        assert_eq!(parse_day_first("03/02/2025").unwrap().date(), ymd(2025, 2, 3));
        assert_eq!(parse_day_first("2025-02-03").unwrap().date(), ymd(2025, 2, 3));
        assert_eq!(parse_day_first("03.02.2025").unwrap().date(), ymd(2025, 2, 3));

        let dt = parse_day_first("03/02/2025 14:30").unwrap();
        assert_eq!(dt.date(), ymd(2025, 2, 3));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_day_first_rejects_non_dates() {
        assert!(parse_day_first("").is_none());
        assert!(parse_day_first("abc").is_none());
        assert!(parse_day_first("12345").is_none());
        assert!(parse_day_first("-42").is_none());
        assert!(parse_day_first("31/02/2025").is_none());
    }

    #[test]
    fn test_parse_task_date_finds_fragment() {
        assert_eq!(parse_task_date("lundi 03/02/2025"), Some(ymd(2025, 2, 3)));
        assert_eq!(parse_task_date("2025-02-04"), Some(ymd(2025, 2, 4)));
        assert_eq!(parse_task_date("99/99/2025"), None);
        assert_eq!(parse_task_date("n/a"), None);
    }

    #[test]
    fn test_parse_range_bound() {
        assert_eq!(parse_range_bound("01/03/2025"), Some(ymd(2025, 3, 1)));
        assert_eq!(parse_range_bound("2025-03-01"), Some(ymd(2025, 3, 1)));
        assert_eq!(parse_range_bound("March 1st"), None);
    }
}
