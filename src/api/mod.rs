// ==========================================
// RDV 排期与分配系统 - API 层
// ==========================================
// 职责: 对外业务操作,入参校验、错误映射、操作日志
// ==========================================

pub mod assignment_api;
pub mod directory_api;
pub mod error;
pub mod planning_api;
pub mod template_api;
pub mod validator;

// 重导出核心类型
pub use assignment_api::{AssignmentApi, RouteDistances};
pub use directory_api::DirectoryApi;
pub use error::{ApiError, ApiResult};
pub use planning_api::PlanningApi;
pub use template_api::{ApplyTemplateReport, SkippedCell, TemplateApi};
