// ==========================================
// RDV 排期与分配系统 - 可用容量网格领域模型
// ==========================================
// 职责: (省份, 日期, 时段) 格子的容量/关闭状态
// 红线: booked 永不持久化,每次读取时由 RDV 索引重新计算
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::calendar::IsoWeek;
use crate::domain::time_slot::SlotId;
use crate::domain::types::DepartmentCode;

// ==========================================
// AvailabilityCell - 容量格子（持久化部分）
// ==========================================
// capacity = None 表示"未配置/未建排期",与 Some(0)（明确封锁）不同
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCell {
    pub department: DepartmentCode,
    pub date: NaiveDate,
    pub slot_id: SlotId,
    pub capacity: Option<i32>,
    pub closed: bool,
}

// ==========================================
// OccupancyLevel - 占用等级（供视图着色）
// ==========================================
// 规则仅用于提示,不作为硬约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyLevel {
    Unconfigured, // 未配置且无预约
    Neutral,      // booked = 0
    Partial,      // 0 < booked < capacity
    Full,         // booked == capacity
    OverCapacity, // booked > capacity（超订）
    Closed,       // 关闭优先于以上所有
}

impl OccupancyLevel {
    pub fn evaluate(capacity: Option<i32>, booked: u32, closed: bool) -> Self {
        if closed {
            return OccupancyLevel::Closed;
        }
        if booked == 0 {
            return match capacity {
                Some(_) => OccupancyLevel::Neutral,
                None => OccupancyLevel::Unconfigured,
            };
        }
        let cap = match capacity {
            Some(c) => c.max(0) as u32,
            None => return OccupancyLevel::OverCapacity,
        };
        if booked < cap {
            OccupancyLevel::Partial
        } else if booked == cap {
            OccupancyLevel::Full
        } else {
            OccupancyLevel::OverCapacity
        }
    }
}

// ==========================================
// CellView - 读取视图中的单个格子
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub capacity: Option<i32>,
    pub closed: bool,
    pub booked: u32,
    pub level: OccupancyLevel,
}

impl CellView {
    pub fn new(capacity: Option<i32>, closed: bool, booked: u32) -> Self {
        Self {
            capacity,
            closed,
            booked,
            level: OccupancyLevel::evaluate(capacity, booked, closed),
        }
    }
}

/// 单日合计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotals {
    pub date: NaiveDate,
    pub capacity_total: i32, // 已配置容量之和（None 记 0）
    pub booked_total: u32,
    pub closed_slots: u32,
}

// ==========================================
// WeekGrid - 一个省份一周的网格
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekGrid {
    pub department: DepartmentCode,
    pub week: IsoWeek,
    pub cells: BTreeMap<NaiveDate, BTreeMap<SlotId, CellView>>,
}

impl WeekGrid {
    pub fn cell(&self, date: NaiveDate, slot_id: SlotId) -> Option<&CellView> {
        self.cells.get(&date).and_then(|day| day.get(&slot_id))
    }

    pub fn day_totals(&self) -> Vec<DayTotals> {
        self.cells
            .iter()
            .map(|(date, slots)| DayTotals {
                date: *date,
                capacity_total: slots.values().filter_map(|c| c.capacity).sum(),
                booked_total: slots.values().map(|c| c.booked).sum(),
                closed_slots: slots.values().filter(|c| c.closed).count() as u32,
            })
            .collect()
    }
}

/// 省份排期总览（一周）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentWeekSummary {
    pub department: DepartmentCode,
    pub name: String,
    pub days: Vec<DayTotals>,
}
