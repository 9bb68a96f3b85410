// ==========================================
// RDV 排期与分配系统 - 核心库
// ==========================================
// 范围: 省份×日期×时段 容量网格、周模板、RDV 分配
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体、类型与日历算术
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - booked 计算与路线服务
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ActionLog, ActionType, Appointment, AppointmentId, AssignedState, AssignmentState,
    AvailabilityCell, BatchFailure, BatchReport, CellView, CommercialId, DepartmentCode, IsoWeek,
    OccupancyLevel, Qualification, SlotId, TemplateRow, TimeSlot, WeekGrid, TIME_SLOTS,
};

// 引擎
pub use engine::{BookingCounter, DistanceMatrix, RouteStop, RoutingService};

// API
pub use api::{ApiError, ApiResult, AssignmentApi, DirectoryApi, PlanningApi, TemplateApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "RDV 排期与分配系统";
