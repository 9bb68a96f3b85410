// ==========================================
// RDV 排期与分配系统 - ISO 周历计算
// ==========================================
// 职责: 日期 <-> (ISO 年, ISO 周, 星期) 互转
// 红线: 纯函数,无副作用,不访问存储
// 说明: 只建模周一至周五,周末不是可寻址的格子
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 周历计算错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("无效的ISO周: year={year}, week={week}")]
    InvalidWeek { year: i32, week: u32 },

    #[error("日期不是工作日(周一至周五): {0}")]
    NotBusinessDay(NaiveDate),

    #[error("年份超出支持范围: {0}")]
    YearOutOfRange(i32),
}

pub type CalendarResult<T> = Result<T, CalendarError>;

// ==========================================
// IsoWeek - ISO 周
// ==========================================
// 用途: 标识一个周一至周五区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    /// 创建并校验 ISO 周（week 必须在 1..=last_week_of(year)）
    pub fn new(year: i32, week: u32) -> CalendarResult<Self> {
        let last = last_week_of(year)?;
        if week == 0 || week > last {
            return Err(CalendarError::InvalidWeek { year, week });
        }
        Ok(Self { year, week })
    }

    /// 日期所在的 ISO 周（周末也返回所属周）
    pub fn containing(date: NaiveDate) -> Self {
        iso_week_of(date)
    }

    /// 本周周一
    pub fn monday(&self) -> CalendarResult<NaiveDate> {
        monday_of(self.year, self.week)
    }

    /// 本周周五
    pub fn friday(&self) -> CalendarResult<NaiveDate> {
        Ok(self.monday()? + Duration::days(4))
    }

    /// 本周五个工作日
    pub fn business_days(&self) -> CalendarResult<Vec<BusinessDay>> {
        weekdays_of(self.year, self.week)
    }

    /// 日期是否落在本周的周一至周五
    pub fn contains(&self, date: NaiveDate) -> bool {
        is_business_day(date) && iso_week_of(date) == *self
    }

    /// 下一个 ISO 周（跨年时自动进位）
    pub fn next(&self) -> CalendarResult<Self> {
        let monday = self.monday()?;
        Ok(iso_week_of(monday + Duration::days(7)))
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

// ==========================================
// BusinessDay - 工作日
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDay {
    pub weekday: u32, // 1=周一 .. 5=周五
    pub date: NaiveDate,
}

impl BusinessDay {
    pub fn label(&self) -> &'static str {
        weekday_label(self.weekday)
    }
}

/// 工作日标签（业务端为法语界面）
pub fn weekday_label(weekday: u32) -> &'static str {
    match weekday {
        1 => "Lundi",
        2 => "Mardi",
        3 => "Mercredi",
        4 => "Jeudi",
        5 => "Vendredi",
        6 => "Samedi",
        _ => "Dimanche",
    }
}

/// ISO 星期序号（周一=1 .. 周日=7）
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// 是否为周一至周五
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 日期所在 ISO 周
///
/// 先把日期平移到同一周的周四,周四所在年份即 ISO 年;
/// 周数 = ceil((周四距当年1月1日的天数 + 1) / 7)
pub fn iso_week_of(date: NaiveDate) -> IsoWeek {
    let day_num = iso_weekday(date) as i64;
    let thursday = date + Duration::days(4 - day_num);

    // ordinal0 即距1月1日的天数
    let days_since_jan1 = thursday.ordinal0();
    IsoWeek {
        year: thursday.year(),
        week: days_since_jan1 / 7 + 1,
    }
}

/// ISO 周的周一
///
/// 1月4日必在第1周内: week1_monday = jan4 - (weekday(jan4) - 1)
pub fn monday_of(year: i32, week: u32) -> CalendarResult<NaiveDate> {
    let last = last_week_of(year)?;
    if week == 0 || week > last {
        return Err(CalendarError::InvalidWeek { year, week });
    }

    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4).ok_or(CalendarError::YearOutOfRange(year))?;
    let week1_monday = jan4 - Duration::days(iso_weekday(jan4) as i64 - 1);
    Ok(week1_monday + Duration::days((week as i64 - 1) * 7))
}

/// 年份的最后一个 ISO 周（52 或 53）
///
/// 12月28日必在当年最后一周内
pub fn last_week_of(year: i32) -> CalendarResult<u32> {
    let dec28 =
        NaiveDate::from_ymd_opt(year, 12, 28).ok_or(CalendarError::YearOutOfRange(year))?;
    Ok(iso_week_of(dec28).week)
}

/// ISO 周的五个工作日（周一至周五）
pub fn weekdays_of(year: i32, week: u32) -> CalendarResult<Vec<BusinessDay>> {
    let monday = monday_of(year, week)?;
    Ok((0..5)
        .map(|offset| BusinessDay {
            weekday: offset + 1,
            date: monday + Duration::days(offset as i64),
        })
        .collect())
}

/// 工作日所属 ISO 周（周末返回错误）
pub fn business_week_of(date: NaiveDate) -> CalendarResult<IsoWeek> {
    if !is_business_day(date) {
        return Err(CalendarError::NotBusinessDay(date));
    }
    Ok(iso_week_of(date))
}
