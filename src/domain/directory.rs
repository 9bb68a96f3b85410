// ==========================================
// RDV 排期与分配系统 - 省份/商务目录
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{CommercialId, DepartmentCode};

/// 省份目录项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub code: DepartmentCode,
    pub name: String,
}

/// 商务目录项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commercial {
    pub id: CommercialId,
    pub name: String,
    pub active: bool,
}
