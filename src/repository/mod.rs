// ==========================================
// 排班派工系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 值一律参数化绑定；动态表名/列名经 quote_ident 校验
// ==========================================

pub mod error;
pub mod ingest_repo;
pub mod schema_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use ingest_repo::{IngestRepository, IngestRow};
pub use schema_repo::{ColumnMetaEntity, SchemaRepository, SchemaSyncResult};
