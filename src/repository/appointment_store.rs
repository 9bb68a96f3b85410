// ==========================================
// RDV 排期与分配系统 - RDV 存储接口 Trait
// ==========================================
// 职责: 定义外部 RDV 存储的请求/响应契约（不包含实现）
// 红线: 排期引擎只通过 update_assignment 修改 RDV
// ==========================================

use crate::domain::appointment::Appointment;
use crate::domain::types::{AppointmentId, CommercialId, DepartmentCode};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;

// ==========================================
// AppointmentStore Trait
// ==========================================
// 实现者: SqliteAppointmentStore（本地适配表 appointment）
pub trait AppointmentStore: Send + Sync {
    /// 查询省份在时间范围内的 RDV（闭区间,含未确认）
    fn query(
        &self,
        department: &DepartmentCode,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>>;

    /// 按ID查询
    fn find_by_id(&self, id: AppointmentId) -> RepositoryResult<Option<Appointment>>;

    /// 更新分配的商务（None 表示取消分配）
    ///
    /// # 返回
    /// - Err(RepositoryError::NotFound): RDV 不存在
    fn update_assignment(
        &self,
        id: AppointmentId,
        commercial_id: Option<CommercialId>,
    ) -> RepositoryResult<()>;
}
