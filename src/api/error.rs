// ==========================================
// RDV 排期与分配系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 分类: 校验错误 / 状态冲突 / 上游失败(可重试) / 数据访问
// ==========================================

use crate::domain::calendar::CalendarError;
use crate::domain::time_slot::SlotId;
use crate::engine::routing::RoutingError;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验错误（调用方可修正，不重试）
    // ==========================================
    #[error("无效容量: {value}（必须 ≥ 0）")]
    InvalidCapacity { value: i32 },

    #[error("无效的ISO周: year={year}, week={week}")]
    InvalidWeek { year: i32, week: u32 },

    #[error("无效工作日: {0}（仅支持周一至周五）")]
    InvalidWeekday(String),

    #[error("无效时段: {0}")]
    InvalidSlot(String),

    #[error("无效省份: {0}")]
    InvalidDepartment(String),

    #[error("有效地址不足: 仅 {valid} 个有效邮编（至少需要 2 个）")]
    InsufficientAddresses { valid: usize },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 状态冲突
    // ==========================================
    #[error("格子已关闭: department={department}, date={date}, slot={slot_id}")]
    CellClosed {
        department: String,
        date: NaiveDate,
        slot_id: SlotId,
    },

    // ==========================================
    // 上游/协作方失败（可重试，由调用方决定）
    // ==========================================
    #[error("路线服务不可用: {0}")]
    RoutingUnavailable(String),

    #[error("数据库忙: {0}")]
    DatabaseBusy(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为可重试错误（上游或存储暂时不可用）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RoutingUnavailable(_)
                | ApiError::DatabaseBusy(_)
                | ApiError::DatabaseConnectionError(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseBusy(msg) => ApiError::DatabaseBusy(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}存储值错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 CalendarError 转换
// ==========================================
impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::InvalidWeek { year, week } => ApiError::InvalidWeek { year, week },
            CalendarError::NotBusinessDay(date) => {
                ApiError::InvalidWeekday(format!("{} 不是工作日", date))
            }
            CalendarError::YearOutOfRange(year) => ApiError::InvalidWeek { year, week: 0 },
        }
    }
}

// ==========================================
// 从 RoutingError 转换
// ==========================================
impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        ApiError::RoutingUnavailable(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Appointment".to_string(),
            id: "42".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Appointment"));
                assert!(msg.contains("42"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::DatabaseBusy("locked".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseBusy(_)));
        assert!(api_err.is_retryable());
    }

    #[test]
    fn test_calendar_error_conversion() {
        let api_err: ApiError = CalendarError::InvalidWeek {
            year: 2021,
            week: 53,
        }
        .into();
        assert!(matches!(
            api_err,
            ApiError::InvalidWeek {
                year: 2021,
                week: 53
            }
        ));
        assert!(!api_err.is_retryable());
    }

    #[test]
    fn test_routing_error_可重试() {
        let api_err: ApiError = RoutingError::Timeout(Duration::from_millis(10)).into();
        assert!(matches!(api_err, ApiError::RoutingUnavailable(_)));
        assert!(api_err.is_retryable());
    }

    #[test]
    fn test_校验错误不可重试() {
        assert!(!ApiError::InvalidCapacity { value: -1 }.is_retryable());
        assert!(!ApiError::InsufficientAddresses { valid: 1 }.is_retryable());
        assert!(!ApiError::CellClosed {
            department: "75".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            slot_id: 32400,
        }
        .is_retryable());
    }
}
