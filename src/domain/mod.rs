// ==========================================
// 排班派工系统 - 领域模型层
// ==========================================
// 职责: 定义导入与派工的领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod table;
pub mod types;

// 重导出核心类型
pub use assignment::{
    AssignmentOutput, AssignmentReport, CompetencyIndex, PriorityTable, Requirement,
    RotationKey, ShiftAvailability, TaskAssignment, TaskLine, UNRANKED_PRIORITY,
};
pub use table::{ColumnSpec, IngestOutcome, TableDescriptor};
pub use types::{ExtractKind, IngestStatus, SqlColumnType};
