// ==========================================
// RDV 排期与分配系统 - 周模板 API
// ==========================================
// 职责: 模板查询/维护、按周清零、跨周复制、应用到容量网格
// 说明: 模板为"天"粒度;应用时每个时段取同一值（set_day_capacity 语义）
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    require_known_department, validate_capacity, validate_week, validate_weekday,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::BatchReport;
use crate::domain::calendar::{BusinessDay, IsoWeek};
use crate::domain::template::{rows_from_entries, TemplateRow, WeeklyTemplateEntry};
use crate::domain::time_slot::SlotId;
use crate::domain::types::DepartmentCode;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::availability_repo::AvailabilityRepository;
use crate::repository::directory_repo::DirectoryRepository;
use crate::repository::template_repo::WeeklyTemplateRepository;

/// 因关闭而未写入的格子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCell {
    pub department: DepartmentCode,
    pub date: NaiveDate,
    pub slot_id: SlotId,
}

/// 模板应用结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyTemplateReport {
    pub departments: BatchReport<String>,
    pub closed_cells: Vec<SkippedCell>,
}

// ==========================================
// TemplateApi - 周模板 API
// ==========================================
pub struct TemplateApi {
    template_repo: Arc<WeeklyTemplateRepository>,
    availability_repo: Arc<AvailabilityRepository>,
    directory_repo: Arc<DirectoryRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl TemplateApi {
    pub fn new(
        template_repo: Arc<WeeklyTemplateRepository>,
        availability_repo: Arc<AvailabilityRepository>,
        directory_repo: Arc<DirectoryRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            template_repo,
            availability_repo,
            directory_repo,
            action_log_repo,
        }
    }

    /// 查询一周的模板（每个省份一行,周一至周五各一个人数）
    pub fn list_template(&self, year: i32, week: u32) -> ApiResult<Vec<TemplateRow>> {
        let week = validate_week(year, week)?;
        let entries = self.template_repo.list_week(week)?;
        Ok(rows_from_entries(&entries))
    }

    /// 插入或更新单个模板条目
    ///
    /// # 参数
    /// - weekday: 1=周一 .. 5=周五
    /// - commercial_count: 商务人数（≥ 0）
    pub fn upsert_entry(
        &self,
        department: &str,
        year: i32,
        week: u32,
        weekday: u32,
        commercial_count: i32,
        operator: &str,
    ) -> ApiResult<()> {
        let department = require_known_department(&self.directory_repo, department)?;
        let week = validate_week(year, week)?;
        validate_weekday(weekday)?;
        validate_capacity(commercial_count)?;

        self.template_repo.upsert_entry(&WeeklyTemplateEntry {
            department: department.clone(),
            week,
            weekday,
            commercial_count,
        })?;

        info!(department = %department, week = %week, weekday, commercial_count, "更新模板条目");

        self.log_action(
            ActionLog::new(ActionType::UpsertTemplate, operator)
                .with_department(department.as_str())
                .with_payload(json!({
                    "week": week.to_string(),
                    "weekday": weekday,
                    "commercial_count": commercial_count,
                })),
        );
        Ok(())
    }

    /// 将一周所有省份×工作日清零（仅影响该周）
    ///
    /// # 返回
    /// - Ok(usize): 写入的条目数
    pub fn reset_week(&self, year: i32, week: u32, operator: &str) -> ApiResult<usize> {
        let week = validate_week(year, week)?;
        let departments: Vec<DepartmentCode> = self
            .directory_repo
            .list_departments()?
            .into_iter()
            .map(|d| d.code)
            .collect();

        let count = self.template_repo.reset_week(week, &departments)?;

        info!(week = %week, count, "模板周已清零");

        self.log_action(
            ActionLog::new(ActionType::ResetTemplate, operator)
                .with_payload(json!({ "week": week.to_string() }))
                .with_impact(json!({ "entries": count })),
        );
        Ok(count)
    }

    /// 删除省份在某周的模板行
    pub fn delete_entry(
        &self,
        department: &str,
        year: i32,
        week: u32,
        operator: &str,
    ) -> ApiResult<usize> {
        let department = require_known_department(&self.directory_repo, department)?;
        let week = validate_week(year, week)?;

        let deleted = self
            .template_repo
            .delete_department_week(&department, week)?;

        info!(department = %department, week = %week, deleted, "删除模板行");

        self.log_action(
            ActionLog::new(ActionType::DeleteTemplate, operator)
                .with_department(department.as_str())
                .with_payload(json!({ "week": week.to_string() }))
                .with_impact(json!({ "deleted": deleted })),
        );
        Ok(deleted)
    }

    /// 将源周模板复制到多个目标周（可跨年）
    ///
    /// 每个目标周独立成功/失败;目标周无效只影响该项
    pub fn duplicate_template(
        &self,
        source_year: i32,
        source_week: u32,
        targets: &[(i32, u32)],
        operator: &str,
    ) -> ApiResult<BatchReport<IsoWeek>> {
        let source = validate_week(source_year, source_week)?;
        if targets.is_empty() {
            return Err(ApiError::InvalidInput("目标周列表不能为空".to_string()));
        }

        let mut report = BatchReport::new();
        for &(year, week) in targets {
            let key = IsoWeek { year, week };
            let outcome = validate_week(year, week)
                .and_then(|target| Ok(self.template_repo.copy_week(source, target)?));
            if let Err(e) = &outcome {
                warn!(source = %source, target = %key, error = %e, "模板复制失败");
            }
            report.record(key, outcome);
        }

        info!(
            source = %source,
            succeeded = report.success_count(),
            failed = report.fail_count(),
            "模板复制完成"
        );

        self.log_action(
            ActionLog::new(ActionType::DuplicateTemplate, operator)
                .with_payload(json!({
                    "source": source.to_string(),
                    "targets": targets.iter().map(|(y, w)| format!("{}-W{:02}", y, w)).collect::<Vec<_>>(),
                }))
                .with_impact(json!({
                    "success_count": report.success_count(),
                    "fail_count": report.fail_count(),
                })),
        );
        Ok(report)
    }

    /// 将某周模板应用到同一周的容量网格
    ///
    /// 每个省份独立成功/失败;已关闭的时段跳过并列入 closed_cells
    pub fn apply_template(
        &self,
        year: i32,
        week: u32,
        departments: &[String],
        operator: &str,
    ) -> ApiResult<ApplyTemplateReport> {
        let week = validate_week(year, week)?;
        if departments.is_empty() {
            return Err(ApiError::InvalidInput("省份列表不能为空".to_string()));
        }

        let rows = rows_from_entries(&self.template_repo.list_week(week)?);
        let days = week.business_days()?;

        let mut result = ApplyTemplateReport::default();
        for raw in departments {
            let outcome = self.apply_department(raw, &rows, &days, &mut result.closed_cells);
            if let Err(e) = &outcome {
                warn!(department = %raw, week = %week, error = %e, "模板应用失败");
            }
            result.departments.record(raw.clone(), outcome);
        }

        info!(
            week = %week,
            succeeded = result.departments.success_count(),
            failed = result.departments.fail_count(),
            closed_cells = result.closed_cells.len(),
            "模板已应用到网格"
        );

        let mut log = ActionLog::new(ActionType::ApplyTemplate, operator)
            .with_payload(json!({ "week": week.to_string(), "departments": departments }))
            .with_impact(json!({
                "success_count": result.departments.success_count(),
                "fail_count": result.departments.fail_count(),
                "closed_cells": result.closed_cells.len(),
            }));
        if let (Some(first), Some(last)) = (days.first(), days.last()) {
            log = log.with_date_range(first.date, last.date);
        }
        self.log_action(log);

        Ok(result)
    }

    /// 单个省份的模板应用在一个事务中完成,失败时该省份网格不变
    fn apply_department(
        &self,
        raw: &str,
        rows: &[TemplateRow],
        days: &[BusinessDay],
        closed_cells: &mut Vec<SkippedCell>,
    ) -> ApiResult<()> {
        let department = require_known_department(&self.directory_repo, raw)?;
        let row = rows
            .iter()
            .find(|r| r.department == department)
            .ok_or_else(|| ApiError::NotFound(format!("省份{}在该周没有模板", department)))?;

        let day_values: Vec<(NaiveDate, i32)> = row
            .entries()
            .iter()
            .filter_map(|&(weekday, count)| {
                days.iter()
                    .find(|d| d.weekday == weekday)
                    .map(|d| (d.date, count))
            })
            .collect();

        let skipped = self
            .availability_repo
            .upsert_days_capacity_if_open(&department, &day_values)?;
        closed_cells.extend(skipped.into_iter().map(|(date, slot_id)| SkippedCell {
            department: department.clone(),
            date,
            slot_id,
        }));
        Ok(())
    }

    fn log_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}
