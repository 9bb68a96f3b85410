// ==========================================
// RDV 排期与分配系统 - 时段目录 (Créneaux)
// ==========================================
// 职责: 每日6个固定时段的静态参考数据
// 说明: 时段以"距当地零点的秒数"表示,以起始秒数为标识
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// 时段ID = 起始偏移秒数
pub type SlotId = u32;

// ==========================================
// TimeSlot - 时段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start_offset_secs: u32, // 起始（含）
    pub end_offset_secs: u32,   // 结束（含）
    pub label: &'static str,
}

const fn hms(h: u32, m: u32, s: u32) -> u32 {
    h * 3600 + m * 60 + s
}

/// 固定时段目录（不可变）
pub const TIME_SLOTS: [TimeSlot; 6] = [
    TimeSlot {
        start_offset_secs: hms(9, 0, 0),
        end_offset_secs: hms(10, 59, 59),
        label: "09h00 - 11h00",
    },
    TimeSlot {
        start_offset_secs: hms(11, 0, 0),
        end_offset_secs: hms(12, 59, 59),
        label: "11h00 - 13h00",
    },
    TimeSlot {
        start_offset_secs: hms(13, 0, 0),
        end_offset_secs: hms(15, 59, 59),
        label: "13h00 - 16h00",
    },
    TimeSlot {
        start_offset_secs: hms(16, 0, 0),
        end_offset_secs: hms(17, 59, 59),
        label: "16h00 - 18h00",
    },
    TimeSlot {
        start_offset_secs: hms(18, 0, 0),
        end_offset_secs: hms(19, 29, 59),
        label: "18h00 - 19h30",
    },
    TimeSlot {
        start_offset_secs: hms(19, 30, 0),
        end_offset_secs: hms(20, 0, 0),
        label: "19h30 - 20h00",
    },
];

impl TimeSlot {
    pub fn id(&self) -> SlotId {
        self.start_offset_secs
    }

    /// 时段在指定日期的闭区间 [start, end]
    pub fn bounds_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        (
            midnight + Duration::seconds(self.start_offset_secs as i64),
            midnight + Duration::seconds(self.end_offset_secs as i64),
        )
    }

    pub fn contains_offset(&self, offset_secs: u32) -> bool {
        offset_secs >= self.start_offset_secs && offset_secs <= self.end_offset_secs
    }
}

/// 全部时段
pub fn all_slots() -> &'static [TimeSlot] {
    &TIME_SLOTS
}

/// 全部时段ID（按时间顺序）
pub fn slot_ids() -> impl Iterator<Item = SlotId> {
    TIME_SLOTS.iter().map(TimeSlot::id)
}

/// 按ID查找时段
pub fn find_slot(slot_id: SlotId) -> Option<&'static TimeSlot> {
    TIME_SLOTS.iter().find(|s| s.id() == slot_id)
}

/// 时间戳所在时段（不在任何时段内返回 None）
pub fn slot_of(ts: NaiveDateTime) -> Option<&'static TimeSlot> {
    let offset = ts.time().num_seconds_from_midnight();
    TIME_SLOTS.iter().find(|s| s.contains_offset(offset))
}
