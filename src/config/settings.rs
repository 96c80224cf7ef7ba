// ==========================================
// 排班派工系统 - 运行参数
// ==========================================
// 职责: 文件格式 / 导入参数 / 派工参数的强类型表示与校验
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use chrono::format::{Item, StrftimeItems};
use encoding_rs::Encoding;

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_ENCODING: &str = "windows-1252";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;
pub const DEFAULT_MAX_PER_RESOURCE_PER_DAY: i64 = 1;
pub const DEFAULT_MAX_PASSES: usize = 10;
pub const DEFAULT_OUTPUT_COLUMN: &str = "Ressource_affectee";
pub const DEFAULT_BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ==========================================
// FileFormat - 分隔文本格式
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct FileFormat {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl FileFormat {
    /// 由配置值构造（分隔符须为单字节，编码须为 WHATWG 标签）
    pub fn from_labels(delimiter: &str, encoding: &str) -> ConfigResult<Self> {
        let delimiter = match delimiter.as_bytes() {
            [b] => *b,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "delimiter".to_string(),
                    value: delimiter.to_string(),
                    message: "分隔符必须为单字节字符".to_string(),
                })
            }
        };
        let encoding =
            Encoding::for_label(encoding.trim().as_bytes()).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "encoding".to_string(),
                    value: encoding.to_string(),
                    message: "未知的字符编码".to_string(),
                }
            })?;
        Ok(Self {
            delimiter,
            encoding,
        })
    }
}

impl Default for FileFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

// ==========================================
// IngestSettings - 导入参数
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub format: FileFormat,
    pub chunk_size: usize,   // 每批 UPSERT 行数
    pub sample_limit: usize, // 类型推断采样上限
}

impl IngestSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ingest.chunk_size".to_string(),
                value: "0".to_string(),
                message: "批大小必须为正整数".to_string(),
            });
        }
        if self.sample_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ingest.sample_limit".to_string(),
                value: "0".to_string(),
                message: "采样上限必须为正整数".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            format: FileFormat::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

// ==========================================
// AssignSettings - 派工参数
// ==========================================
#[derive(Debug, Clone)]
pub struct AssignSettings {
    pub format: FileFormat,
    pub max_per_resource_per_day: i64,
    pub max_passes: usize,
    pub output_column: String,
    pub backup_timestamp_format: String,
}

impl AssignSettings {
    /// 替换每人每日上限（调用方显式传入时使用）
    pub fn with_cap(mut self, cap: i64) -> Self {
        self.max_per_resource_per_day = cap;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_per_resource_per_day <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "assign.max_per_resource_per_day".to_string(),
                value: self.max_per_resource_per_day.to_string(),
                message: "每人每日上限必须为正整数".to_string(),
            });
        }
        if self.max_passes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "assign.max_passes".to_string(),
                value: "0".to_string(),
                message: "派工轮数必须为正整数".to_string(),
            });
        }
        if self.output_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "assign.output_column".to_string(),
                value: self.output_column.clone(),
                message: "派工结果列名不能为空".to_string(),
            });
        }
        if !is_valid_strftime(&self.backup_timestamp_format) {
            return Err(ConfigError::InvalidValue {
                key: "assign.backup_timestamp_format".to_string(),
                value: self.backup_timestamp_format.clone(),
                message: "备份时间戳格式包含无效的格式说明符".to_string(),
            });
        }
        Ok(())
    }
}

/// 时间格式串是否可被 chrono 完整解析
pub fn is_valid_strftime(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl Default for AssignSettings {
    fn default() -> Self {
        Self {
            format: FileFormat::default(),
            max_per_resource_per_day: DEFAULT_MAX_PER_RESOURCE_PER_DAY,
            max_passes: DEFAULT_MAX_PASSES,
            output_column: DEFAULT_OUTPUT_COLUMN.to_string(),
            backup_timestamp_format: DEFAULT_BACKUP_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_labels() {
        let format = FileFormat::from_labels(",", "utf-8").unwrap();
        assert_eq!(format.delimiter, b',');
        assert_eq!(format.encoding, encoding_rs::UTF_8);

        assert!(FileFormat::from_labels(";;", "utf-8").is_err());
        assert!(FileFormat::from_labels(";", "klingon").is_err());
    }

    #[test]
    fn test_assign_settings_rejects_non_positive_cap() {
        assert!(AssignSettings::default().validate().is_ok());
        assert!(AssignSettings::default().with_cap(0).validate().is_err());
        assert!(AssignSettings::default().with_cap(-3).validate().is_err());
    }

    #[test]
    fn test_assign_settings_rejects_bad_timestamp_format() {
        let mut settings = AssignSettings::default();
        settings.backup_timestamp_format = "%Y%m%d_%Q".to_string();
        assert!(settings.validate().is_err());

        settings.backup_timestamp_format = "%d-%m-%Y_%Hh%M".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_ingest_settings_defaults_are_valid() {
        let settings = IngestSettings::default();
        assert_eq!(settings.chunk_size, 1000);
        assert!(settings.validate().is_ok());
    }
}
