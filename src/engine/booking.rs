// ==========================================
// RDV 排期与分配系统 - 已预约数计算
// ==========================================
// 职责: 由 RDV 列表实时计算每个 (日期, 时段) 的 booked
// 红线: booked 不缓存、不持久化,每次请求重新计算
// 口径: 已确认 + 省份一致 + scheduled_at ∈ [date+slot.start, date+slot.end]
// ==========================================

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::appointment::Appointment;
use crate::domain::time_slot::{slot_of, SlotId};
use crate::domain::types::DepartmentCode;

/// 已预约数计数器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct BookingCounter;

impl BookingCounter {
    pub fn new() -> Self {
        Self
    }

    /// 该 RDV 是否占用容量
    pub fn occupies(&self, appointment: &Appointment, department: &DepartmentCode) -> bool {
        appointment.confirmed && appointment.department == *department
    }

    /// 按 (日期, 时段) 汇总
    ///
    /// 不在任何时段内的 RDV 不计入
    pub fn count_by_cell(
        &self,
        appointments: &[Appointment],
        department: &DepartmentCode,
    ) -> HashMap<(NaiveDate, SlotId), u32> {
        let mut counts: HashMap<(NaiveDate, SlotId), u32> = HashMap::new();
        for appointment in appointments {
            if !self.occupies(appointment, department) {
                continue;
            }
            if let Some(slot) = slot_of(appointment.scheduled_at) {
                *counts
                    .entry((appointment.scheduled_at.date(), slot.id()))
                    .or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::collections::BTreeSet;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn rdv(id: i64, dept: &str, ts: NaiveDateTime, confirmed: bool) -> Appointment {
        Appointment {
            id,
            scheduled_at: ts,
            department: DepartmentCode::parse(dept).unwrap(),
            assigned_commercial: None,
            confirmed,
            qualifications: BTreeSet::new(),
            postal_code: None,
            city: None,
        }
    }

    #[test]
    fn test_count_by_cell_口径() {
        let dept = DepartmentCode::parse("75").unwrap();
        let appts = vec![
            rdv(1, "75", at(4, 9, 0, 0), true),
            rdv(2, "75", at(4, 10, 59, 59), true),
            rdv(3, "75", at(4, 11, 0, 0), true),
            rdv(4, "75", at(4, 9, 30, 0), false), // 未确认
            rdv(5, "13", at(4, 9, 30, 0), true),  // 其他省份
            rdv(6, "75", at(4, 20, 30, 0), true), // 不在任何时段
        ];

        let counts = BookingCounter::new().count_by_cell(&appts, &dept);
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(counts.get(&(monday, 32400)), Some(&2));
        assert_eq!(counts.get(&(monday, 39600)), Some(&1));
        assert_eq!(counts.values().sum::<u32>(), 3);
    }
}
