// ==========================================
// RDV 排期与分配系统 - RDV 存储 SQLite 实现
// ==========================================
// 依据: repository/appointment_store.rs 契约
// ==========================================

use crate::domain::appointment::{decode_qualifications, encode_qualifications, Appointment};
use crate::domain::types::{AppointmentId, CommercialId, DepartmentCode};
use crate::repository::appointment_store::AppointmentStore;
use crate::repository::error::{parse_department, RepositoryError, RepositoryResult};
use crate::repository::DATETIME_FMT;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT appointment_id, scheduled_at, department, assigned_commercial,
           confirmed, qualifications, postal_code, city
    FROM appointment
"#;

type AppointmentRow = (
    AppointmentId,
    String,
    String,
    Option<CommercialId>,
    bool,
    String,
    Option<String>,
    Option<String>,
);

fn read_row(row: &Row<'_>) -> SqliteResult<AppointmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i32>(4)? != 0,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn appointment_from_row(row: AppointmentRow) -> RepositoryResult<Appointment> {
    let (id, scheduled_at, department, assigned_commercial, confirmed, qualifications, postal_code, city) =
        row;
    let scheduled_at = NaiveDateTime::parse_from_str(&scheduled_at, DATETIME_FMT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: "scheduled_at".to_string(),
            message: format!("{}: {}", scheduled_at, e),
        }
    })?;

    Ok(Appointment {
        id,
        scheduled_at,
        department: parse_department(&department)?,
        assigned_commercial,
        confirmed,
        qualifications: decode_qualifications(&qualifications),
        postal_code,
        city,
    })
}

// ==========================================
// SqliteAppointmentStore
// ==========================================
pub struct SqliteAppointmentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAppointmentStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或替换 RDV（外部流程同步/测试数据准备用）
    pub fn upsert(&self, appointment: &Appointment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO appointment (
                appointment_id, scheduled_at, department, assigned_commercial,
                confirmed, qualifications, postal_code, city
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                appointment.id,
                appointment.scheduled_at.format(DATETIME_FMT).to_string(),
                appointment.department.as_str(),
                appointment.assigned_commercial,
                appointment.confirmed as i32,
                encode_qualifications(&appointment.qualifications),
                appointment.postal_code,
                appointment.city,
            ],
        )?;
        Ok(())
    }

    /// 设置确认状态（外部流程用）
    pub fn set_confirmed(&self, id: AppointmentId, confirmed: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE appointment SET confirmed = ?1 WHERE appointment_id = ?2",
            params![confirmed as i32, id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Appointment".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn query(
        &self,
        department: &DepartmentCode,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE department = ?1 AND scheduled_at BETWEEN ?2 AND ?3 ORDER BY scheduled_at, appointment_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    department.as_str(),
                    from.format(DATETIME_FMT).to_string(),
                    to.format(DATETIME_FMT).to_string()
                ],
                read_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter().map(appointment_from_row).collect()
    }

    fn find_by_id(&self, id: AppointmentId) -> RepositoryResult<Option<Appointment>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE appointment_id = ?1", SELECT_COLUMNS);
        let row = conn.query_row(&sql, params![id], read_row).optional()?;
        row.map(appointment_from_row).transpose()
    }

    fn update_assignment(
        &self,
        id: AppointmentId,
        commercial_id: Option<CommercialId>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE appointment SET assigned_commercial = ?1 WHERE appointment_id = ?2",
            params![commercial_id, id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Appointment".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
