// ==========================================
// RDV 排期与分配系统 - 排期（容量网格）API
// ==========================================
// 职责: 周网格查询、格子/整天容量设置、关闭状态管理、按周复制
// 红线: 已关闭格子不接受普通容量修改（需先 force_open）
// 红线: booked 每次读取时实时计算
// 红线: 所有写入只接受目录中的省份
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    parse_department, require_known_department, validate_business_date, validate_capacity,
    validate_slot, validate_week,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::availability::{AvailabilityCell, CellView, DepartmentWeekSummary, WeekGrid};
use crate::domain::batch::{BatchFailure, BatchReport};
use crate::domain::calendar::IsoWeek;
use crate::domain::time_slot::{slot_ids, SlotId};
use crate::domain::types::DepartmentCode;
use crate::engine::booking::BookingCounter;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::appointment_store::AppointmentStore;
use crate::repository::availability_repo::AvailabilityRepository;
use crate::repository::directory_repo::DirectoryRepository;

// ==========================================
// PlanningApi - 排期 API
// ==========================================

/// 排期API
///
/// 职责：
/// 1. 周网格查询（容量 + 关闭 + 实时 booked）
/// 2. 单格/整天容量设置
/// 3. 关闭/开放（单格、整天）
/// 4. 周网格跨周复制（按省份独立成功/失败）
/// 5. ActionLog记录
pub struct PlanningApi {
    availability_repo: Arc<AvailabilityRepository>,
    directory_repo: Arc<DirectoryRepository>,
    appointment_store: Arc<dyn AppointmentStore>,
    action_log_repo: Arc<ActionLogRepository>,
    booking: BookingCounter,
}

impl PlanningApi {
    /// 创建新的PlanningApi实例
    ///
    /// # 参数
    /// - availability_repo: 容量格子仓储
    /// - directory_repo: 省份/商务目录仓储
    /// - appointment_store: RDV 存储（用于计算 booked）
    /// - action_log_repo: 操作日志仓储
    pub fn new(
        availability_repo: Arc<AvailabilityRepository>,
        directory_repo: Arc<DirectoryRepository>,
        appointment_store: Arc<dyn AppointmentStore>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            availability_repo,
            directory_repo,
            appointment_store,
            action_log_repo,
            booking: BookingCounter::new(),
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询省份一周的网格
    ///
    /// # 参数
    /// - department: 省份代码
    /// - year / week: ISO 周
    ///
    /// # 返回
    /// - Ok(WeekGrid): 5 天 × 6 时段,不存在的格子返回 capacity=None, closed=false
    /// - Err(ApiError): InvalidDepartment / InvalidWeek / 数据库错误
    pub fn get_week(&self, department: &str, year: i32, week: u32) -> ApiResult<WeekGrid> {
        let department = parse_department(department)?;
        let week = validate_week(year, week)?;
        self.build_week_grid(&department, week)
    }

    /// 所有目录省份一周的每日合计
    pub fn week_overview(&self, year: i32, week: u32) -> ApiResult<Vec<DepartmentWeekSummary>> {
        let week = validate_week(year, week)?;
        let departments = self.directory_repo.list_departments()?;

        let mut summaries = Vec::with_capacity(departments.len());
        for department in departments {
            let grid = self.build_week_grid(&department.code, week)?;
            summaries.push(DepartmentWeekSummary {
                department: department.code,
                name: department.name,
                days: grid.day_totals(),
            });
        }
        Ok(summaries)
    }

    fn build_week_grid(&self, department: &DepartmentCode, week: IsoWeek) -> ApiResult<WeekGrid> {
        let days = week.business_days()?;
        let (monday, friday) = match (days.first(), days.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => return Err(ApiError::InternalError(format!("{} 无工作日", week))),
        };

        let stored: HashMap<(NaiveDate, SlotId), AvailabilityCell> = self
            .availability_repo
            .find_by_date_range(department, monday, friday)?
            .into_iter()
            .map(|cell| ((cell.date, cell.slot_id), cell))
            .collect();

        let (from, to) = day_span(monday, friday);
        let appointments = self.appointment_store.query(department, from, to)?;
        let booked = self.booking.count_by_cell(&appointments, department);

        let mut cells = BTreeMap::new();
        for day in &days {
            let mut row = BTreeMap::new();
            for slot_id in slot_ids() {
                let key = (day.date, slot_id);
                let (capacity, closed) = stored
                    .get(&key)
                    .map(|c| (c.capacity, c.closed))
                    .unwrap_or((None, false));
                let count = booked.get(&key).copied().unwrap_or(0);
                row.insert(slot_id, CellView::new(capacity, closed, count));
            }
            cells.insert(day.date, row);
        }

        debug!(
            department = %department,
            week = %week,
            appointments = appointments.len(),
            "周网格已构建"
        );

        Ok(WeekGrid {
            department: department.clone(),
            week,
            cells,
        })
    }

    // ==========================================
    // 容量设置
    // ==========================================

    /// 设置单个格子容量
    ///
    /// # 返回
    /// - Err(ApiError::InvalidCapacity): value < 0
    /// - Err(ApiError::CellClosed): 格子已关闭
    pub fn set_capacity(
        &self,
        department: &str,
        date: NaiveDate,
        slot_id: SlotId,
        value: i32,
        operator: &str,
    ) -> ApiResult<()> {
        validate_capacity(value)?;
        let department = require_known_department(&self.directory_repo, department)?;
        validate_business_date(date)?;
        validate_slot(slot_id)?;

        let written = self
            .availability_repo
            .upsert_capacity_if_open(&department, date, slot_id, value)?;
        if !written {
            return Err(cell_closed(&department, date, slot_id));
        }

        info!(department = %department, date = %date, slot_id, value, "设置格子容量");

        self.log_action(
            ActionLog::new(ActionType::SetCapacity, operator)
                .with_department(department.as_str())
                .with_date_range(date, date)
                .with_payload(json!({ "slot_id": slot_id, "capacity": value })),
        );
        Ok(())
    }

    /// 设置整天容量（每个时段都设为 value,不做拆分）
    ///
    /// 已关闭的时段跳过,并以 CellClosed 记入 failed;其余时段在同一事务中写入
    pub fn set_day_capacity(
        &self,
        department: &str,
        date: NaiveDate,
        value: i32,
        operator: &str,
    ) -> ApiResult<BatchReport<SlotId>> {
        validate_capacity(value)?;
        let department = require_known_department(&self.directory_repo, department)?;
        validate_business_date(date)?;

        let skipped = self
            .availability_repo
            .upsert_day_capacity_if_open(&department, date, value)?;
        let report = day_report(&department, date, &skipped);

        info!(
            department = %department,
            date = %date,
            value,
            written = report.success_count(),
            skipped = report.fail_count(),
            "设置整天容量"
        );

        self.log_action(
            ActionLog::new(ActionType::SetDayCapacity, operator)
                .with_department(department.as_str())
                .with_date_range(date, date)
                .with_payload(json!({ "capacity": value }))
                .with_impact(json!({
                    "success_count": report.success_count(),
                    "fail_count": report.fail_count(),
                    "closed_slots": skipped,
                })),
        );
        Ok(report)
    }

    // ==========================================
    // 关闭状态
    // ==========================================

    /// 翻转格子关闭状态（不改变容量;容量未配置时同样可关闭）
    ///
    /// # 返回
    /// - Ok(bool): 翻转后的 closed
    pub fn toggle_closed(
        &self,
        department: &str,
        date: NaiveDate,
        slot_id: SlotId,
        operator: &str,
    ) -> ApiResult<bool> {
        let department = require_known_department(&self.directory_repo, department)?;
        validate_business_date(date)?;
        validate_slot(slot_id)?;

        let closed = self
            .availability_repo
            .toggle_closed(&department, date, slot_id)?;

        info!(department = %department, date = %date, slot_id, closed, "翻转格子关闭状态");

        self.log_action(
            ActionLog::new(ActionType::ToggleClosed, operator)
                .with_department(department.as_str())
                .with_date_range(date, date)
                .with_payload(json!({ "slot_id": slot_id, "closed": closed })),
        );
        Ok(closed)
    }

    /// 强制关闭格子（幂等）
    pub fn force_close(
        &self,
        department: &str,
        date: NaiveDate,
        slot_id: SlotId,
        operator: &str,
    ) -> ApiResult<()> {
        self.force_closed(department, date, slot_id, true, operator)
    }

    /// 强制开放格子（幂等）
    pub fn force_open(
        &self,
        department: &str,
        date: NaiveDate,
        slot_id: SlotId,
        operator: &str,
    ) -> ApiResult<()> {
        self.force_closed(department, date, slot_id, false, operator)
    }

    fn force_closed(
        &self,
        department: &str,
        date: NaiveDate,
        slot_id: SlotId,
        closed: bool,
        operator: &str,
    ) -> ApiResult<()> {
        let department = require_known_department(&self.directory_repo, department)?;
        validate_business_date(date)?;
        validate_slot(slot_id)?;

        self.availability_repo
            .set_closed(&department, date, slot_id, closed)?;

        info!(department = %department, date = %date, slot_id, closed, "强制设置格子关闭状态");

        self.log_action(
            ActionLog::new(ActionType::ForceClosed, operator)
                .with_department(department.as_str())
                .with_date_range(date, date)
                .with_payload(json!({ "slot_id": slot_id, "closed": closed })),
        );
        Ok(())
    }

    /// 整天关闭/开放
    ///
    /// 六个时段已全部关闭时全部开放,否则全部关闭
    ///
    /// # 返回
    /// - Ok(bool): 操作后的 closed
    pub fn toggle_day_closed(
        &self,
        department: &str,
        date: NaiveDate,
        operator: &str,
    ) -> ApiResult<bool> {
        let department = require_known_department(&self.directory_repo, department)?;
        validate_business_date(date)?;

        let closed = self.availability_repo.toggle_day_closed(&department, date)?;

        info!(department = %department, date = %date, closed, "整天关闭状态切换");

        self.log_action(
            ActionLog::new(ActionType::ToggleDayClosed, operator)
                .with_department(department.as_str())
                .with_date_range(date, date)
                .with_payload(json!({ "closed": closed })),
        );
        Ok(closed)
    }

    // ==========================================
    // 按周复制
    // ==========================================

    /// 将源周网格（容量 + 关闭）复制到目标周
    ///
    /// # 参数
    /// - departments: 省份代码列表（逐个独立处理）
    ///
    /// # 返回
    /// - Ok(BatchReport): 成功省份与失败省份（含原因）
    /// - Err(ApiError): 源/目标周无效（整体拒绝,无任何写入）
    pub fn duplicate_week(
        &self,
        source_year: i32,
        source_week: u32,
        target_year: i32,
        target_week: u32,
        departments: &[String],
        operator: &str,
    ) -> ApiResult<BatchReport<String>> {
        let source = validate_week(source_year, source_week)?;
        let target = validate_week(target_year, target_week)?;
        if departments.is_empty() {
            return Err(ApiError::InvalidInput("省份列表不能为空".to_string()));
        }

        let mut report = BatchReport::new();
        for raw in departments {
            let outcome = self.duplicate_department_week(raw, source, target);
            if let Err(e) = &outcome {
                warn!(department = %raw, source = %source, target = %target, error = %e, "省份周复制失败");
            }
            report.record(raw.clone(), outcome);
        }

        info!(
            source = %source,
            target = %target,
            succeeded = report.success_count(),
            failed = report.fail_count(),
            "周网格复制完成"
        );

        let mut log = ActionLog::new(ActionType::DuplicateWeek, operator)
            .with_payload(json!({
                "source": source.to_string(),
                "target": target.to_string(),
                "departments": departments,
            }))
            .with_impact(json!({
                "success_count": report.success_count(),
                "fail_count": report.fail_count(),
                "failed": report.failed.iter().map(|f: &BatchFailure<String>| {
                    json!({ "department": f.key, "error": f.error })
                }).collect::<Vec<_>>(),
            }));
        if let (Ok(start), Ok(end)) = (target.monday(), target.friday()) {
            log = log.with_date_range(start, end);
        }
        self.log_action(log);

        Ok(report)
    }

    fn duplicate_department_week(
        &self,
        raw: &str,
        source: IsoWeek,
        target: IsoWeek,
    ) -> ApiResult<usize> {
        let department = require_known_department(&self.directory_repo, raw)?;

        let source_monday = source.monday()?;
        let target_monday = target.monday()?;
        let offset = target_monday - source_monday;

        let copied: Vec<AvailabilityCell> = self
            .availability_repo
            .find_by_date_range(&department, source_monday, source.friday()?)?
            .into_iter()
            .map(|cell| AvailabilityCell {
                date: cell.date + offset,
                ..cell
            })
            .collect();

        let written = self.availability_repo.replace_range(
            &department,
            target_monday,
            target.friday()?,
            &copied,
        )?;

        debug!(department = %department, written, "省份周网格已复制");
        Ok(written)
    }

    fn log_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

// ==========================================
// 共享辅助
// ==========================================

fn cell_closed(department: &DepartmentCode, date: NaiveDate, slot_id: SlotId) -> ApiError {
    ApiError::CellClosed {
        department: department.to_string(),
        date,
        slot_id,
    }
}

fn day_report(department: &DepartmentCode, date: NaiveDate, skipped: &[SlotId]) -> BatchReport<SlotId> {
    let mut report = BatchReport::new();
    for slot_id in slot_ids() {
        let outcome = if skipped.contains(&slot_id) {
            Err(cell_closed(department, date, slot_id))
        } else {
            Ok(())
        };
        report.record(slot_id, outcome);
    }
    report
}

/// [monday 00:00:00, friday 23:59:59]
fn day_span(first: NaiveDate, last: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let from = first.and_time(NaiveTime::MIN);
    let to = (last + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::seconds(1);
    (from, to)
}
