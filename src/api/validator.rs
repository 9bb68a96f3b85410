// ==========================================
// RDV 排期与分配系统 - 入参校验
// ==========================================
// 职责: 在任何写入之前完成边界校验
// 说明: 校验失败直接返回,不产生副作用
// ==========================================

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::calendar::{business_week_of, IsoWeek};
use crate::domain::time_slot::{find_slot, SlotId, TimeSlot};
use crate::domain::types::DepartmentCode;
use crate::repository::directory_repo::DirectoryRepository;

/// 解析省份代码
pub fn parse_department(raw: &str) -> ApiResult<DepartmentCode> {
    DepartmentCode::parse(raw).map_err(ApiError::InvalidDepartment)
}

/// 解析省份代码并要求其在目录中
///
/// 所有写入格子/模板的操作都经过此校验,
/// 保证写入的省份在 week_overview / duplicate_week 中可见
///
/// # 返回
/// - Err(ApiError::InvalidDepartment): 格式无效或不在目录中
pub fn require_known_department(
    directory_repo: &DirectoryRepository,
    raw: &str,
) -> ApiResult<DepartmentCode> {
    let department = parse_department(raw)?;
    if !directory_repo.department_exists(&department)? {
        return Err(ApiError::InvalidDepartment(format!(
            "省份不在目录中: {}",
            department
        )));
    }
    Ok(department)
}

/// 校验 ISO 周
pub fn validate_week(year: i32, week: u32) -> ApiResult<IsoWeek> {
    Ok(IsoWeek::new(year, week)?)
}

/// 校验日期为工作日（周一至周五）
///
/// # 返回
/// - Ok(IsoWeek): 日期所属 ISO 周
pub fn validate_business_date(date: NaiveDate) -> ApiResult<IsoWeek> {
    Ok(business_week_of(date)?)
}

/// 校验工作日序号（1=周一 .. 5=周五）
pub fn validate_weekday(weekday: u32) -> ApiResult<()> {
    if (1..=5).contains(&weekday) {
        Ok(())
    } else {
        Err(ApiError::InvalidWeekday(format!("weekday={}", weekday)))
    }
}

/// 校验时段ID
pub fn validate_slot(slot_id: SlotId) -> ApiResult<&'static TimeSlot> {
    find_slot(slot_id).ok_or_else(|| ApiError::InvalidSlot(format!("slot_id={}", slot_id)))
}

/// 校验容量/人数（≥ 0）
pub fn validate_capacity(value: i32) -> ApiResult<()> {
    if value < 0 {
        Err(ApiError::InvalidCapacity { value })
    } else {
        Ok(())
    }
}
