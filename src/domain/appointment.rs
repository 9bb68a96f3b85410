// ==========================================
// RDV 排期与分配系统 - RDV 读模型
// ==========================================
// 职责: RDV 在排期/分配视角下可见的字段
// 说明: RDV 记录本身（Fiche）由外部流程维护,这里只读取
//       assigned_commercial 仅由分配引擎修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::time_slot::{slot_of, SlotId};
use crate::domain::types::{AppointmentId, CommercialId, DepartmentCode};

// ==========================================
// Qualification - RDV 资格标签
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Qualification {
    Urgent,    // 紧急
    Cancelled, // 已取消
    SoloValid, // 单人有效
    Duo,       // 双人到场
    Callback,  // 待回电
}

impl Qualification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualification::Urgent => "URGENT",
            Qualification::Cancelled => "CANCELLED",
            Qualification::SoloValid => "SOLO_VALID",
            Qualification::Duo => "DUO",
            Qualification::Callback => "CALLBACK",
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qualification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "URGENT" => Ok(Qualification::Urgent),
            "CANCELLED" => Ok(Qualification::Cancelled),
            "SOLO_VALID" => Ok(Qualification::SoloValid),
            "DUO" => Ok(Qualification::Duo),
            "CALLBACK" => Ok(Qualification::Callback),
            other => Err(format!("未知的RDV标签: {}", other)),
        }
    }
}

/// 标签集合 <-> 存储文本（逗号分隔）
pub fn encode_qualifications(flags: &BTreeSet<Qualification>) -> String {
    flags
        .iter()
        .map(Qualification::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// 解析存储文本,未知标签忽略
pub fn decode_qualifications(raw: &str) -> BTreeSet<Qualification> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

// ==========================================
// AssignmentState - 分配状态机
// ==========================================
// Unassigned <-> AssignedTo(c) <-> AssignedTo(c'),所有转换均允许,不保留历史
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentState {
    Unassigned,
    AssignedTo(CommercialId),
}

impl From<Option<CommercialId>> for AssignmentState {
    fn from(value: Option<CommercialId>) -> Self {
        match value {
            Some(id) => AssignmentState::AssignedTo(id),
            None => AssignmentState::Unassigned,
        }
    }
}

// ==========================================
// Appointment - RDV
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub scheduled_at: NaiveDateTime,
    pub department: DepartmentCode,
    pub assigned_commercial: Option<CommercialId>,
    pub confirmed: bool, // 只有已确认的 RDV 占用容量且可分配
    pub qualifications: BTreeSet<Qualification>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

impl Appointment {
    pub fn assignment_state(&self) -> AssignmentState {
        self.assigned_commercial.into()
    }

    /// 所在时段（不在任何时段内返回 None）
    pub fn slot_id(&self) -> Option<SlotId> {
        slot_of(self.scheduled_at).map(|s| s.id())
    }

    pub fn has(&self, flag: Qualification) -> bool {
        self.qualifications.contains(&flag)
    }
}
