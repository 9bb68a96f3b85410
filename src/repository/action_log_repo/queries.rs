use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::{DATETIME_FMT, DATE_FMT};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, action_type, action_ts, actor,
           payload_json, impact_summary_json, department,
           date_range_start, date_range_end, detail
    FROM action_log
"#;

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?1", SELECT_COLUMNS);

        let log = conn
            .query_row(&sql, params![action_id], map_row)
            .optional()?;
        Ok(log)
    }

    /// 查询省份的操作日志（时间倒序）
    pub fn find_by_department(&self, department: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE department = ?1 ORDER BY action_ts DESC, rowid DESC",
            SELECT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![department], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 按操作类型查询（时间倒序）
    pub fn find_by_action_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE action_type = ?1 ORDER BY action_ts DESC, rowid DESC",
            SELECT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![action_type], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 最近的 N 条日志
    pub fn find_recent(&self, limit: u32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY action_ts DESC, rowid DESC LIMIT ?1", SELECT_COLUMNS);

        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let action_ts_str: String = row.get(2)?;
    let action_ts = NaiveDateTime::parse_from_str(&action_ts_str, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    // JSON/日期字段解析失败时按缺省处理
    let payload_json = row
        .get::<_, Option<String>>(4)?
        .and_then(|s| serde_json::from_str(&s).ok());
    let impact_summary_json = row
        .get::<_, Option<String>>(5)?
        .and_then(|s| serde_json::from_str(&s).ok());
    let date_range_start = row
        .get::<_, Option<String>>(7)?
        .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok());
    let date_range_end = row
        .get::<_, Option<String>>(8)?
        .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok());

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts,
        actor: row.get(3)?,
        payload_json,
        impact_summary_json,
        department: row.get(6)?,
        date_range_start,
        date_range_end,
        detail: row.get(9)?,
    })
}
