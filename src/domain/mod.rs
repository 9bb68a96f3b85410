// ==========================================
// RDV 排期与分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、纯函数规则
// 红线: 不含数据访问逻辑
// ==========================================

pub mod action_log;
pub mod appointment;
pub mod availability;
pub mod batch;
pub mod calendar;
pub mod directory;
pub mod template;
pub mod time_slot;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use appointment::{Appointment, AssignmentState, Qualification};
pub use availability::{
    AvailabilityCell, CellView, DayTotals, DepartmentWeekSummary, OccupancyLevel, WeekGrid,
};
pub use batch::{BatchFailure, BatchReport};
pub use calendar::{BusinessDay, CalendarError, IsoWeek};
pub use directory::{Commercial, Department};
pub use template::{TemplateRow, WeeklyTemplateEntry};
pub use time_slot::{SlotId, TimeSlot, TIME_SLOTS};
pub use types::{AppointmentId, AssignedState, CommercialId, DepartmentCode};
