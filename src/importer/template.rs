// ==========================================
// 排班派工系统 - 空白导入模板
// ==========================================
// 表头 + N 行空白；表头未知时仅输出一行提示
// ==========================================

use crate::config::FileFormat;
use crate::domain::types::ExtractKind;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{write_delimited, RawTable, UniversalFileParser};
use std::path::Path;

/// 默认空白行数
pub const DEFAULT_TEMPLATE_ROWS: usize = 5;

/// 渲染空白模板
///
/// # 参数
/// - logical: 逻辑数据集名（用于提示行）
/// - headers: 已知表头；None 或为空时输出提示行
/// - rows: 空白行数
pub fn header_template(
    logical: &str,
    headers: Option<&[String]>,
    rows: usize,
    format: &FileFormat,
) -> ImportResult<Vec<u8>> {
    let table = match headers {
        Some(h) if !h.is_empty() => RawTable::new(h.to_vec(), vec![vec![String::new(); h.len()]; rows]),
        _ => RawTable::new(vec![format!("No headers available for {}", logical)], Vec::new()),
    };
    write_delimited(&table, format)
}

/// 以目录中现有 `{logical}.csv` 的表头渲染模板
///
/// 文件不存在或无法解析时退化为提示行
pub fn template_for_kind(
    folder: &Path,
    kind: ExtractKind,
    rows: usize,
    format: &FileFormat,
) -> ImportResult<Vec<u8>> {
    let path = folder.join(kind.file_name());
    let headers = if path.is_file() {
        match UniversalFileParser::new(*format).parse_path(&path) {
            Ok(table) => Some(table.headers),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "读取模板表头失败");
                None
            }
        }
    } else {
        None
    };
    header_template(kind.logical_name(), headers.as_deref(), rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> String {
        encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
    }

    #[test]
    fn test_template_with_headers() {
        let headers = vec!["Nom".to_string(), "Compétence".to_string()];
        let bytes = header_template("competencies", Some(&headers), 2, &FileFormat::default()).unwrap();
        assert_eq!(decode(&bytes), "Nom;Compétence\n;\n;\n");
    }

    #[test]
    fn test_template_without_headers() {
        let bytes = header_template("attendance", None, 5, &FileFormat::default()).unwrap();
        assert_eq!(decode(&bytes), "No headers available for attendance\n");
    }

    #[test]
    fn test_template_for_kind_reads_existing_headers() {
        let dir = tempfile::tempdir().unwrap();
        let format = FileFormat::default();
        std::fs::write(dir.path().join("priorities.csv"), b"Nom;Priorite\nA1;1\n").unwrap();

        let bytes = template_for_kind(dir.path(), ExtractKind::Priorities, 1, &format).unwrap();
        assert_eq!(decode(&bytes), "Nom;Priorite\n;\n");

        let missing = template_for_kind(dir.path(), ExtractKind::TaskLines, 1, &format).unwrap();
        assert_eq!(decode(&missing), "No headers available for task_lines\n");
    }
}
