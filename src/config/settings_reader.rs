// ==========================================
// 排班派工系统 - 运行参数读取 Trait
// ==========================================
// 职责: 定义导入/派工所需的参数读取接口（不包含实现）
// 实现者: ConfigManager（config_kv 表）、StaticSettings（固定值）
// ==========================================

use crate::config::error::ConfigResult;
use crate::config::settings::{AssignSettings, IngestSettings};

pub trait SettingsReader {
    /// 导入参数（分隔符 / 编码 / 批大小 / 采样上限）
    fn ingest_settings(&self) -> ConfigResult<IngestSettings>;

    /// 派工参数（每人每日上限 / 轮数 / 输出列 / 备份时间戳格式）
    fn assign_settings(&self) -> ConfigResult<AssignSettings>;
}

/// 固定参数（不读库；用于嵌入调用与测试）
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    pub ingest: IngestSettings,
    pub assign: AssignSettings,
}

impl SettingsReader for StaticSettings {
    fn ingest_settings(&self) -> ConfigResult<IngestSettings> {
        self.ingest.validate()?;
        Ok(self.ingest)
    }

    fn assign_settings(&self) -> ConfigResult<AssignSettings> {
        self.assign.validate()?;
        Ok(self.assign.clone())
    }
}
