// ==========================================
// 排班派工系统 - 派工引擎层
// ==========================================
// 职责: 列识别 → 可用性/资质/优先级解析 → 多轮轮转派工 → 输出与后处理
// 红线: 引擎不访问数据库；输入均为已解析的表格
// ==========================================

pub mod assignment;
pub mod availability;
pub mod column_rules;
pub mod competency;
pub mod error;
pub mod output_writer;
pub mod priority;
pub mod propagation;
pub mod task_lines;

// 重导出核心引擎
pub use assignment::{
    AssignmentEngine, AssignmentInputs, AssignmentOutcome, AssignmentRequest, DateRange,
    DayResolution,
};
pub use availability::{resolve_availability, AvailabilityResolver};
pub use column_rules::{ColumnMatch, ColumnRule, HeaderPattern};
pub use competency::build_competency_index;
pub use error::{EngineError, EngineResult};
pub use output_writer::{write_with_backup, OutputTarget};
pub use priority::build_priority_table;
pub use propagation::{fill_resource_by_group, fill_splits_from_assignment};
pub use task_lines::TaskExtract;
