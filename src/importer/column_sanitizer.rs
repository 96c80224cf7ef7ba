// ==========================================
// 排班派工系统 - 列名规范化
// ==========================================
// 规则: 去重音(NFKD 后仅保留 ASCII) → 小写 → 非字母数字替换为 '_'
//       → 合并连续 '_' → 去首尾 '_' → 为空时回退 "table"
// 同一规则也用于表名
// ==========================================

use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// 规范化后为空时的回退名
pub const FALLBACK_IDENTIFIER: &str = "table";

/// 规范化标识符（列名 / 表名）
pub fn sanitize_identifier(name: &str) -> String {
    let folded: String = name.nfkd().filter(char::is_ascii).collect();

    let mut out = String::with_capacity(folded.len());
    for ch in folded.to_ascii_lowercase().chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        // 合并连续下划线
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_IDENTIFIER.to_string()
    } else {
        trimmed.to_string()
    }
}

// ==========================================
// SanitizedHeaders - 规范化结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedHeaders {
    /// 与源表头一一对应的规范化名（可能重复）
    pub canonical: Vec<String>,
    /// 规范化名 → 原始表头（重复时后出现者覆盖）
    pub original_by_canonical: HashMap<String, String>,
}

impl SanitizedHeaders {
    pub fn original_name(&self, canonical: &str) -> Option<&str> {
        self.original_by_canonical.get(canonical).map(String::as_str)
    }

    /// 去重后的列：(规范化名, 源列序号)，按首次出现顺序；
    /// 重复列取最后一次出现的源列（与映射“后者覆盖”一致）
    pub fn unique_columns(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut last_index: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in self.canonical.iter().enumerate() {
            if !last_index.contains_key(name.as_str()) {
                order.push(name.clone());
            }
            last_index.insert(name.as_str(), idx);
        }
        order
            .into_iter()
            .map(|name| {
                let idx = last_index[name.as_str()];
                (name, idx)
            })
            .collect()
    }
}

/// 规范化整行表头，记录 规范化名 → 原始名 映射
pub fn sanitize_headers(headers: &[String]) -> SanitizedHeaders {
    let mut result = SanitizedHeaders::default();
    for header in headers {
        let canonical = sanitize_identifier(header);
        result
            .original_by_canonical
            .insert(canonical.clone(), header.clone());
        result.canonical.push(canonical);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier_folds_diacritics() {
        assert_eq!(sanitize_identifier("Compétence"), "competence");
        assert_eq!(sanitize_identifier("Nom Prénom"), "nom_prenom");
        assert_eq!(sanitize_identifier("TachesSéparé"), "tachessepare");
    }

    #[test]
    fn test_sanitize_identifier_collapses_and_trims() {
        assert_eq!(sanitize_identifier("  Ligne -- de planche (n°) "), "ligne_de_planche_n");
        assert_eq!(sanitize_identifier("__a__b__"), "a_b");
        assert_eq!(sanitize_identifier("Qualif.1"), "qualif_1");
    }

    #[test]
    fn test_sanitize_identifier_fallback() {
        assert_eq!(sanitize_identifier(""), "table");
        assert_eq!(sanitize_identifier("###"), "table");
        assert_eq!(sanitize_identifier("日期"), "table");
    }

    #[test]
    fn test_duplicate_canonical_last_wins() {
        let headers = vec![
            "Nom".to_string(),
            "Date".to_string(),
            "NOM".to_string(),
        ];
        let sanitized = sanitize_headers(&headers);

        assert_eq!(sanitized.canonical, vec!["nom", "date", "nom"]);
        assert_eq!(sanitized.original_name("nom"), Some("NOM"));
        assert_eq!(
            sanitized.unique_columns(),
            vec![("nom".to_string(), 2), ("date".to_string(), 1)]
        );
    }
}
