// ==========================================
// 排班派工系统 - 公共工具
// ==========================================
// 职责: 导入层与引擎层共享的纯函数（日期解析 / 文本规范化）
// 红线: 无状态、无 I/O
// ==========================================

pub mod dates;
pub mod text;

pub use dates::{parse_day_first, parse_range_bound, parse_task_date};
pub use text::{extract_codes, has_letter, is_missing, normalize_resource_name};
