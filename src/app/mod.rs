// ==========================================
// RDV 排期与分配系统 - 应用层
// ==========================================
// 职责: 由数据库路径装配全部仓储与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
