// ==========================================
// 排班派工系统 - 派工结果输出
// ==========================================
// 文件模式: 已有输出先改名备份 `{stem}_backup_{ts}.{ext}`（重名追加序号），再写新文件
// 字节模式: 仅返回编码后的内容，无落盘副作用
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use chrono::Local;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// 输出目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Bytes,
}

/// 生成不与现有文件冲突的备份路径
pub fn backup_path_for(path: &Path, timestamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut candidate = dir.join(format!("{}_backup_{}{}", stem, timestamp, ext));
    let mut seq = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_backup_{}_{}{}", stem, timestamp, seq, ext));
        seq += 1;
    }
    candidate
}

/// 备份已有输出后写入新内容
///
/// # 返回
/// - Ok(Some(path)): 已备份旧文件
/// - Ok(None): 原先无输出文件
pub fn write_with_backup(
    path: &Path,
    contents: &[u8],
    timestamp_format: &str,
) -> EngineResult<Option<PathBuf>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let backup = if path.is_file() {
        let mut timestamp = String::new();
        write!(timestamp, "{}", Local::now().format(timestamp_format)).map_err(|_| {
            EngineError::Validation(format!("无效的备份时间戳格式: {}", timestamp_format))
        })?;
        let backup = backup_path_for(path, &timestamp);
        fs::rename(path, &backup)?;
        tracing::info!(backup = %backup.display(), "已备份旧输出文件");
        Some(backup)
    } else {
        None
    };

    fs::write(path, contents)?;
    tracing::info!(output = %path.display(), bytes = contents.len(), "派工结果已写出");
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_sequence_when_taken() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("affectation.csv");

        let first = backup_path_for(&out, "20250203_080000");
        assert_eq!(first, dir.path().join("affectation_backup_20250203_080000.csv"));

        fs::write(&first, b"x").unwrap();
        let second = backup_path_for(&out, "20250203_080000");
        assert_eq!(second, dir.path().join("affectation_backup_20250203_080000_1.csv"));
    }

    #[test]
    fn test_write_with_backup_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sub").join("affectation.csv");

        assert_eq!(write_with_backup(&out, b"v1", "%Y%m%d_%H%M%S").unwrap(), None);
        let backup = write_with_backup(&out, b"v2", "%Y%m%d_%H%M%S")
            .unwrap()
            .expect("backup expected");

        assert_eq!(fs::read(&out).unwrap(), b"v2");
        assert_eq!(fs::read(&backup).unwrap(), b"v1");
    }

    #[test]
    fn test_bad_timestamp_format_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("affectation.csv");
        fs::write(&out, b"old").unwrap();

        let err = write_with_backup(&out, b"new", "%Q").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(fs::read(&out).unwrap(), b"old");
    }
}
