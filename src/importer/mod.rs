// ==========================================
// 排班派工系统 - 导入层
// ==========================================
// 职责: 外部数据集入库（自动建表/补列 + 内容哈希去重）
// 支持: 分隔文本 (.csv/.txt)、Excel (.xlsx/.xls)
// ==========================================

// 模块声明
pub mod column_sanitizer;
pub mod error;
pub mod file_parser;
pub mod row_hasher;
pub mod table_ingestor;
pub mod template;
pub mod type_inferencer;
pub mod value_coercer;

// 重导出核心类型
pub use column_sanitizer::{sanitize_headers, sanitize_identifier, SanitizedHeaders};
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    write_delimited, CsvParser, ExcelParser, ExtractSource, FileParser, RawTable,
    UniversalFileParser,
};
pub use row_hasher::row_hash;
pub use table_ingestor::{IngestContext, PreparedTable, TableIngestor};
pub use template::{header_template, template_for_kind, DEFAULT_TEMPLATE_ROWS};
pub use type_inferencer::TypeInferencer;
