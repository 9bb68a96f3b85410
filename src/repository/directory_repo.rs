// ==========================================
// RDV 排期与分配系统 - 省份/商务目录仓储
// ==========================================

use crate::domain::directory::{Commercial, Department};
use crate::domain::types::{CommercialId, DepartmentCode};
use crate::repository::error::{parse_department, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct DirectoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DirectoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 省份
    // ==========================================

    pub fn list_departments(&self) -> RepositoryResult<Vec<Department>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT code, name FROM department ORDER BY code")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(code, name)| {
                Ok(Department {
                    code: parse_department(&code)?,
                    name,
                })
            })
            .collect()
    }

    pub fn department_exists(&self, code: &DepartmentCode) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM department WHERE code = ?1",
                params![code.as_str()],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    pub fn upsert_department(&self, department: &Department) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO department (code, name) VALUES (?1, ?2)
            ON CONFLICT(code) DO UPDATE SET name = excluded.name
            "#,
            params![department.code.as_str(), department.name],
        )?;
        Ok(())
    }

    // ==========================================
    // 商务
    // ==========================================

    pub fn list_commercials(&self, active_only: bool) -> RepositoryResult<Vec<Commercial>> {
        let conn = self.get_conn()?;
        let sql = if active_only {
            "SELECT commercial_id, name, active FROM commercial WHERE active = 1 ORDER BY name"
        } else {
            "SELECT commercial_id, name, active FROM commercial ORDER BY name"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Commercial {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get::<_, i32>(2)? != 0,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_commercial(&self, id: CommercialId) -> RepositoryResult<Option<Commercial>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT commercial_id, name, active FROM commercial WHERE commercial_id = ?1",
                params![id],
                |row| {
                    Ok(Commercial {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        active: row.get::<_, i32>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    pub fn upsert_commercial(&self, commercial: &Commercial) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO commercial (commercial_id, name, active) VALUES (?1, ?2, ?3)
            ON CONFLICT(commercial_id) DO UPDATE SET
                name = excluded.name,
                active = excluded.active
            "#,
            params![commercial.id, commercial.name, commercial.active as i32],
        )?;
        Ok(())
    }
}
