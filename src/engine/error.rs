// ==========================================
// 排班派工系统 - 派工引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级:
// - Configuration: 缺少必需列族 / 无可处理日期，整次运行失败
// - Validation: 运行前参数校验失败（上限、日期区间）
// - PartialData: 可选数据集缺失或无法解析，仅记录告警后以空映射继续
// ==========================================

use crate::config::ConfigError;
use crate::importer::ImportError;
use thiserror::Error;

/// 派工引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("数据集不完整 ({dataset}): {message}")]
    PartialData { dataset: String, message: String },

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 处理失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("数据集读取失败: {0}")]
    Import(#[from] ImportError),

    #[error("配置读取失败: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::PartialData { .. })
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_data_is_not_fatal() {
        let partial = EngineError::PartialData {
            dataset: "attendance".to_string(),
            message: "not found".to_string(),
        };
        assert!(!partial.is_fatal());
        assert!(EngineError::Configuration("x".to_string()).is_fatal());
        assert_eq!(
            partial.to_string(),
            "数据集不完整 (attendance): not found"
        );
    }
}
