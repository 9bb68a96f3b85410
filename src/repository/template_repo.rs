// ==========================================
// RDV 排期与分配系统 - 周模板仓储
// ==========================================
// 职责:
// - 管理 weekly_template（省份×ISO周×工作日 -> 商务人数）
// - 多行写入（清零/复制）按单事务执行
// ==========================================

use crate::domain::calendar::IsoWeek;
use crate::domain::template::WeeklyTemplateEntry;
use crate::domain::types::DepartmentCode;
use crate::repository::error::{parse_department, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct WeeklyTemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WeeklyTemplateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn upsert_with(
        conn: &Connection,
        department: &str,
        week: IsoWeek,
        weekday: u32,
        commercial_count: i32,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            INSERT INTO weekly_template (department, iso_year, iso_week, weekday, commercial_count, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(department, iso_year, iso_week, weekday) DO UPDATE SET
                commercial_count = excluded.commercial_count,
                updated_at = excluded.updated_at
            "#,
            params![department, week.year, week.week, weekday, commercial_count],
        )?;
        Ok(affected)
    }

    /// 查询一周的全部模板条目（按省份、工作日排序）
    pub fn list_week(&self, week: IsoWeek) -> RepositoryResult<Vec<WeeklyTemplateEntry>> {
        let conn = self.get_conn()?;
        Self::list_week_with(&conn, week)
    }

    fn list_week_with(conn: &Connection, week: IsoWeek) -> RepositoryResult<Vec<WeeklyTemplateEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT department, weekday, commercial_count
            FROM weekly_template
            WHERE iso_year = ?1 AND iso_week = ?2
            ORDER BY department, weekday
            "#,
        )?;

        let rows = stmt
            .query_map(params![week.year, week.week], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, i32>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(department, weekday, commercial_count)| {
                Ok(WeeklyTemplateEntry {
                    department: parse_department(&department)?,
                    week,
                    weekday,
                    commercial_count,
                })
            })
            .collect()
    }

    /// 插入或更新单个条目
    pub fn upsert_entry(&self, entry: &WeeklyTemplateEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::upsert_with(
            &conn,
            entry.department.as_str(),
            entry.week,
            entry.weekday,
            entry.commercial_count,
        )?;
        Ok(())
    }

    /// 删除省份在某周的全部条目
    ///
    /// # 返回
    /// - Ok(rows): 删除行数
    pub fn delete_department_week(
        &self,
        department: &DepartmentCode,
        week: IsoWeek,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM weekly_template WHERE department = ?1 AND iso_year = ?2 AND iso_week = ?3",
            params![department.as_str(), week.year, week.week],
        )?;
        Ok(rows)
    }

    /// 将一周所有省份×工作日清零（单事务）
    ///
    /// 覆盖范围: extra_departments ∪ 本周已有条目的省份
    pub fn reset_week(
        &self,
        week: IsoWeek,
        extra_departments: &[DepartmentCode],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut departments: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT department FROM weekly_template WHERE iso_year = ?1 AND iso_week = ?2",
            )?;
            let rows = stmt
                .query_map(params![week.year, week.week], |row| row.get::<_, String>(0))?
                .collect::<SqliteResult<Vec<String>>>()?;
            rows
        };
        for d in extra_departments {
            if !departments.iter().any(|x| x == d.as_str()) {
                departments.push(d.as_str().to_string());
            }
        }

        let mut count = 0;
        for department in &departments {
            for weekday in 1..=5 {
                count += Self::upsert_with(&tx, department, week, weekday, 0)?;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 以源周条目覆盖目标周（单事务）
    ///
    /// 目标周中源周未出现的省份保持不变
    pub fn copy_week(&self, source: IsoWeek, target: IsoWeek) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let entries = Self::list_week_with(&tx, source)?;
        let mut count = 0;
        for entry in &entries {
            count += Self::upsert_with(
                &tx,
                entry.department.as_str(),
                target,
                entry.weekday,
                entry.commercial_count,
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup() -> WeeklyTemplateRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        WeeklyTemplateRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn entry(dept: &str, week: IsoWeek, weekday: u32, count: i32) -> WeeklyTemplateEntry {
        WeeklyTemplateEntry {
            department: DepartmentCode::parse(dept).unwrap(),
            week,
            weekday,
            commercial_count: count,
        }
    }

    #[test]
    fn test_reset_week_只影响本周() {
        let repo = setup();
        let w10 = IsoWeek { year: 2024, week: 10 };
        let w11 = IsoWeek { year: 2024, week: 11 };
        repo.upsert_entry(&entry("75", w10, 1, 3)).unwrap();
        repo.upsert_entry(&entry("75", w11, 1, 5)).unwrap();

        let written = repo
            .reset_week(w10, &[DepartmentCode::parse("13").unwrap()])
            .unwrap();
        assert_eq!(written, 10);

        let w10_entries = repo.list_week(w10).unwrap();
        assert_eq!(w10_entries.len(), 10);
        assert!(w10_entries.iter().all(|e| e.commercial_count == 0));
        assert_eq!(repo.list_week(w11).unwrap()[0].commercial_count, 5);
    }

    #[test]
    fn test_copy_week() {
        let repo = setup();
        let src = IsoWeek { year: 2024, week: 52 };
        let dst = IsoWeek { year: 2025, week: 1 };
        repo.upsert_entry(&entry("69", src, 2, 4)).unwrap();
        repo.copy_week(src, dst).unwrap();

        let copied = repo.list_week(dst).unwrap();
        assert_eq!(copied, vec![entry("69", dst, 2, 4)]);
    }
}
