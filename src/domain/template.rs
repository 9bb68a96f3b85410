// ==========================================
// RDV 排期与分配系统 - 周模板领域模型
// ==========================================
// 用途: 按省份×工作日给出默认容量（商务人数）,用于初始化/复制新周
// 说明: 模板只有"天"粒度,应用到网格时按 set_day_capacity 语义展开到每个时段
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::calendar::IsoWeek;
use crate::domain::types::DepartmentCode;

// ==========================================
// WeeklyTemplateEntry - 模板条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTemplateEntry {
    pub department: DepartmentCode,
    pub week: IsoWeek,
    pub weekday: u32, // 1..=5
    pub commercial_count: i32,
}

// ==========================================
// TemplateRow - 一个省份一周的模板行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub department: DepartmentCode,
    pub mon: i32,
    pub tue: i32,
    pub wed: i32,
    pub thu: i32,
    pub fri: i32,
}

impl TemplateRow {
    pub fn empty(department: DepartmentCode) -> Self {
        Self {
            department,
            mon: 0,
            tue: 0,
            wed: 0,
            thu: 0,
            fri: 0,
        }
    }

    /// 按工作日写值,越界工作日忽略并返回 false
    pub fn set(&mut self, weekday: u32, value: i32) -> bool {
        let slot = match weekday {
            1 => &mut self.mon,
            2 => &mut self.tue,
            3 => &mut self.wed,
            4 => &mut self.thu,
            5 => &mut self.fri,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// 展开为 (weekday, count) 列表
    pub fn entries(&self) -> [(u32, i32); 5] {
        [
            (1, self.mon),
            (2, self.tue),
            (3, self.wed),
            (4, self.thu),
            (5, self.fri),
        ]
    }
}

/// 由条目列表聚合为模板行（按省份排序）
pub fn rows_from_entries(entries: &[WeeklyTemplateEntry]) -> Vec<TemplateRow> {
    let mut rows: std::collections::BTreeMap<DepartmentCode, TemplateRow> =
        std::collections::BTreeMap::new();
    for entry in entries {
        rows.entry(entry.department.clone())
            .or_insert_with(|| TemplateRow::empty(entry.department.clone()))
            .set(entry.weekday, entry.commercial_count);
    }
    rows.into_values().collect()
}
