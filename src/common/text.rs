// ==========================================
// 排班派工系统 - 文本规范化
// ==========================================

/// 人员名规范化：折叠空白 + 去首尾空白 + 大写
pub fn normalize_resource_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// 空值判定（空串或源数据导出的 "nan"）
pub fn is_missing(value: &str) -> bool {
    let s = value.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nan")
}

/// 提取资质代码：大写后按非字母数字切分（仅 ASCII 字母数字）
pub fn extract_codes(value: &str) -> Vec<String> {
    if is_missing(value) {
        return Vec::new();
    }
    value
        .to_uppercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// 是否含字母（含带重音的拉丁字母）
pub fn has_letter(value: &str) -> bool {
    value.chars().any(char::is_alphabetic)
}
