// ==========================================
// RDV 排期与分配系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写操作必须记录
// 用途: 审计追踪（谁在何时改了哪个省份哪段日期）
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,        // ActionType 的存储字符串
    pub action_ts: NaiveDateTime,
    pub actor: String,

    pub payload_json: Option<JsonValue>,        // 操作参数
    pub impact_summary_json: Option<JsonValue>, // 影响摘要（成功/失败数等）

    pub department: Option<String>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间创建日志
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            impact_summary_json: None,
            department: None,
            date_range_start: None,
            date_range_end: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_impact(mut self, impact: JsonValue) -> Self {
        self.impact_summary_json = Some(impact);
        self
    }

    pub fn with_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range_start = Some(start);
        self.date_range_end = Some(end);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    SetCapacity,       // 设置格子容量
    SetDayCapacity,    // 设置整天容量
    ToggleClosed,      // 切换格子关闭
    ForceClosed,       // 强制关闭/开启格子
    ToggleDayClosed,   // 切换整天关闭
    DuplicateWeek,     // 复制周网格
    UpsertTemplate,    // 编辑模板条目
    ResetTemplate,     // 模板清零
    DeleteTemplate,    // 删除模板条目
    DuplicateTemplate, // 复制模板
    ApplyTemplate,     // 模板应用到网格
    Assign,            // 分配商务
    Unassign,          // 取消分配
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SetCapacity => "SET_CAPACITY",
            ActionType::SetDayCapacity => "SET_DAY_CAPACITY",
            ActionType::ToggleClosed => "TOGGLE_CLOSED",
            ActionType::ForceClosed => "FORCE_CLOSED",
            ActionType::ToggleDayClosed => "TOGGLE_DAY_CLOSED",
            ActionType::DuplicateWeek => "DUPLICATE_WEEK",
            ActionType::UpsertTemplate => "UPSERT_TEMPLATE",
            ActionType::ResetTemplate => "RESET_TEMPLATE",
            ActionType::DeleteTemplate => "DELETE_TEMPLATE",
            ActionType::DuplicateTemplate => "DUPLICATE_TEMPLATE",
            ActionType::ApplyTemplate => "APPLY_TEMPLATE",
            ActionType::Assign => "ASSIGN",
            ActionType::Unassign => "UNASSIGN",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
