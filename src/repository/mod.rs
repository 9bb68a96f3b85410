// ==========================================
// RDV 排期与分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod appointment_repo;
pub mod appointment_store;
pub mod availability_repo;
pub mod directory_repo;
pub mod error;
pub mod template_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use appointment_repo::SqliteAppointmentStore;
pub use appointment_store::AppointmentStore;
pub use availability_repo::AvailabilityRepository;
pub use directory_repo::DirectoryRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use template_repo::WeeklyTemplateRepository;

/// 日期存储格式
pub const DATE_FMT: &str = "%Y-%m-%d";

/// 时间戳存储格式
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
