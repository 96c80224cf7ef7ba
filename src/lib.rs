// ==========================================
// 排班派工系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 两部分:
// - 导入: 分隔文本/Excel 数据集 → SQLite（自动建表补列 + 内容哈希去重）
// - 派工: 资质 × 出勤 × 优先级 → 轮转公平派工（每人每日上限）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 公共工具 - 日期/文本
pub mod common;

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 派工规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AssignmentOutput, AssignmentReport, ExtractKind, IngestOutcome, IngestStatus, SqlColumnType,
    TaskAssignment,
};

// 引擎
pub use engine::{AssignmentEngine, AssignmentRequest, DateRange, EngineError, OutputTarget};

// 导入
pub use importer::{ExtractSource, ImportError, IngestContext, TableIngestor};

// 配置
pub use config::{AssignSettings, ConfigManager, IngestSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "排班派工系统";
