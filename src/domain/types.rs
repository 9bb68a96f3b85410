// ==========================================
// RDV 排期与分配系统 - 基础类型
// ==========================================
// 职责: 标识符与枚举类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RDV（预约）ID
pub type AppointmentId = i64;

/// 商务（Commercial）ID
pub type CommercialId = i64;

// ==========================================
// DepartmentCode - 省份代码 (Département)
// ==========================================
// 约束: 2位字符（数字或大写字母,如 "75"、"2A"）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepartmentCode(String);

impl DepartmentCode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let code = raw.trim().to_ascii_uppercase();
        if code.chars().count() != 2 {
            return Err(format!("省份代码必须为2位: '{}'", raw));
        }
        if !code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()) {
            return Err(format!("省份代码包含非法字符: '{}'", raw));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DepartmentCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DepartmentCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DepartmentCode> for String {
    fn from(value: DepartmentCode) -> Self {
        value.0
    }
}

// ==========================================
// AssignedState - 分配状态筛选
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedState {
    Assigned,   // 已分配商务
    Unassigned, // 未分配
}

impl fmt::Display for AssignedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignedState::Assigned => write!(f, "ASSIGNED"),
            AssignedState::Unassigned => write!(f, "UNASSIGNED"),
        }
    }
}
