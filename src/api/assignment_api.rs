// ==========================================
// RDV 排期与分配系统 - 分配（Affectation）API
// ==========================================
// 职责: 可分配 RDV 查询、批量分配/取消分配、路线距离参考
// 规则: 批量按条独立,不整体回滚;重复分配后写覆盖先写
// 规则: 只有已确认的 RDV 可分配;容量只作提示,不拦截分配
// ==========================================

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::parse_department;
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::appointment::Appointment;
use crate::domain::batch::BatchReport;
use crate::domain::types::{AppointmentId, AssignedState, CommercialId};
use crate::engine::routing::{
    distance_matrix_with_timeout, DistanceMatrix, RouteStop, RoutingService,
};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::appointment_store::AppointmentStore;
use crate::repository::directory_repo::DirectoryRepository;

/// 路线距离结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDistances {
    /// 实际参与计算的站点（与矩阵行列顺序一致）
    pub stops: Vec<RouteStop>,
    /// 因缺少邮编被过滤的 RDV
    pub skipped: Vec<AppointmentId>,
    pub matrix: DistanceMatrix,
}

// ==========================================
// AssignmentApi - 分配 API
// ==========================================
pub struct AssignmentApi {
    appointment_store: Arc<dyn AppointmentStore>,
    directory_repo: Arc<DirectoryRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    router: Arc<dyn RoutingService>,
}

impl AssignmentApi {
    pub fn new(
        appointment_store: Arc<dyn AppointmentStore>,
        directory_repo: Arc<DirectoryRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        router: Arc<dyn RoutingService>,
    ) -> Self {
        Self {
            appointment_store,
            directory_repo,
            action_log_repo,
            config_manager,
            router,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询可分配的 RDV
    ///
    /// # 参数
    /// - department: 省份代码
    /// - from / to: 日期闭区间
    /// - state: 已分配 / 未分配
    ///
    /// # 返回
    /// - Ok(Vec<Appointment>): 已确认的 RDV,按时间排序
    pub fn list_assignable(
        &self,
        department: &str,
        from: NaiveDate,
        to: NaiveDate,
        state: AssignedState,
    ) -> ApiResult<Vec<Appointment>> {
        let department = parse_department(department)?;
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "日期范围无效: {} > {}",
                from, to
            )));
        }
        let max_days = self
            .config_manager
            .get_assignable_range_max_days()
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;
        let span_days = (to - from).num_days() + 1;
        if span_days > max_days {
            return Err(ApiError::InvalidInput(format!(
                "日期范围过大: {}天（上限{}天）",
                span_days, max_days
            )));
        }

        let start = from.and_time(NaiveTime::MIN);
        let end = (to + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::seconds(1);

        let mut appointments: Vec<Appointment> = self
            .appointment_store
            .query(&department, start, end)?
            .into_iter()
            .filter(|a| a.confirmed && a.department == department)
            .filter(|a| match state {
                AssignedState::Assigned => a.assigned_commercial.is_some(),
                AssignedState::Unassigned => a.assigned_commercial.is_none(),
            })
            .collect();
        appointments.sort_by_key(|a| (a.scheduled_at, a.id));

        Ok(appointments)
    }

    // ==========================================
    // 分配 / 取消分配
    // ==========================================

    /// 批量分配给商务
    ///
    /// 每条独立:不存在或未确认的 RDV 记入 failed,其余照常写入;
    /// 已分配的 RDV 直接覆盖为新商务
    ///
    /// # 返回
    /// - Ok(BatchReport): 成功/失败明细
    /// - Err(ApiError): 列表为空、商务不存在或已停用（整体拒绝,无任何写入）
    pub fn assign(
        &self,
        appointment_ids: &[AppointmentId],
        commercial_id: CommercialId,
        operator: &str,
    ) -> ApiResult<BatchReport<AppointmentId>> {
        if appointment_ids.is_empty() {
            return Err(ApiError::InvalidInput("RDV ID列表不能为空".to_string()));
        }
        let commercial = self
            .directory_repo
            .find_commercial(commercial_id)?
            .ok_or_else(|| ApiError::NotFound(format!("商务(id={})不存在", commercial_id)))?;
        if !commercial.active {
            return Err(ApiError::InvalidInput(format!(
                "商务已停用: {}(id={})",
                commercial.name, commercial_id
            )));
        }

        let mut report = BatchReport::new();
        for &id in appointment_ids {
            let outcome = self.assign_one(id, commercial_id);
            if let Err(e) = &outcome {
                warn!(appointment_id = id, commercial_id, error = %e, "RDV 分配失败");
            }
            report.record(id, outcome);
        }

        info!(
            commercial_id,
            succeeded = report.success_count(),
            failed = report.fail_count(),
            "批量分配完成"
        );

        self.log_action(
            ActionLog::new(ActionType::Assign, operator)
                .with_payload(json!({
                    "appointment_ids": appointment_ids,
                    "commercial_id": commercial_id,
                }))
                .with_impact(json!({
                    "success_count": report.success_count(),
                    "fail_count": report.fail_count(),
                })),
        );
        Ok(report)
    }

    fn assign_one(&self, id: AppointmentId, commercial_id: CommercialId) -> ApiResult<()> {
        let appointment = self
            .appointment_store
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("RDV(id={})不存在", id)))?;
        if !appointment.confirmed {
            return Err(ApiError::InvalidInput(format!("RDV(id={})未确认", id)));
        }
        self.appointment_store
            .update_assignment(id, Some(commercial_id))?;
        Ok(())
    }

    /// 批量取消分配
    pub fn unassign(
        &self,
        appointment_ids: &[AppointmentId],
        operator: &str,
    ) -> ApiResult<BatchReport<AppointmentId>> {
        if appointment_ids.is_empty() {
            return Err(ApiError::InvalidInput("RDV ID列表不能为空".to_string()));
        }

        let mut report = BatchReport::new();
        for &id in appointment_ids {
            let outcome: ApiResult<()> = self
                .appointment_store
                .update_assignment(id, None)
                .map_err(ApiError::from);
            if let Err(e) = &outcome {
                warn!(appointment_id = id, error = %e, "RDV 取消分配失败");
            }
            report.record(id, outcome);
        }

        info!(
            succeeded = report.success_count(),
            failed = report.fail_count(),
            "批量取消分配完成"
        );

        self.log_action(
            ActionLog::new(ActionType::Unassign, operator)
                .with_payload(json!({ "appointment_ids": appointment_ids }))
                .with_impact(json!({
                    "success_count": report.success_count(),
                    "fail_count": report.fail_count(),
                })),
        );
        Ok(report)
    }

    // ==========================================
    // 路线距离
    // ==========================================

    /// 计算所选 RDV 之间的距离矩阵与顺序路线总距离（仅供参考）
    ///
    /// 邮编为空的站点先被过滤;剩余不足 2 个时返回 InsufficientAddresses。
    /// 外部服务超时或失败返回 RoutingUnavailable（可重试,由调用方决定）
    pub async fn compute_route_distances(&self, stops: &[RouteStop]) -> ApiResult<RouteDistances> {
        let (valid, skipped): (Vec<RouteStop>, Vec<RouteStop>) = stops
            .iter()
            .cloned()
            .map(|mut stop| {
                stop.postal_code = stop.postal_code.trim().to_string();
                stop
            })
            .partition(|stop| !stop.postal_code.is_empty());

        if valid.len() < 2 {
            return Err(ApiError::InsufficientAddresses { valid: valid.len() });
        }

        let timeout = self
            .config_manager
            .get_routing_timeout()
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;

        let matrix = distance_matrix_with_timeout(self.router.as_ref(), &valid, timeout)
            .await
            .map_err(|e| {
                warn!(stops = valid.len(), error = %e, "路线服务不可用");
                ApiError::from(e)
            })?;

        if !matrix.is_square(valid.len()) {
            return Err(ApiError::RoutingUnavailable(format!(
                "距离矩阵维度不符: 期望{}×{}",
                valid.len(),
                valid.len()
            )));
        }

        info!(
            stops = valid.len(),
            skipped = skipped.len(),
            total_distance_m = matrix.total_distance_m,
            "路线距离计算完成"
        );

        Ok(RouteDistances {
            stops: valid,
            skipped: skipped.into_iter().map(|s| s.id).collect(),
            matrix,
        })
    }

    fn log_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}
