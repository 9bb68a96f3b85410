// ==========================================
// RDV 排期与分配系统 - 容量格子数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑,只做数据映射
// 说明: 只持久化 capacity/closed,booked 不入库
// ==========================================

use crate::domain::availability::AvailabilityCell;
use crate::domain::time_slot::{slot_ids, SlotId, TIME_SLOTS};
use crate::domain::types::DepartmentCode;
use crate::repository::error::{parse_date, parse_department, RepositoryError, RepositoryResult};
use crate::repository::DATE_FMT;
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, TransactionBehavior};
use std::sync::{Arc, Mutex};

type CellRow = (String, String, u32, Option<i32>, bool);

fn cell_from_row(row: CellRow) -> RepositoryResult<AvailabilityCell> {
    let (department, date, slot_id, capacity, closed) = row;
    Ok(AvailabilityCell {
        department: parse_department(&department)?,
        date: parse_date("cell_date", &date)?,
        slot_id,
        capacity,
        closed,
    })
}

// ==========================================
// AvailabilityRepository - 容量格子仓储
// ==========================================

/// 容量格子仓储
/// 职责: 管理 availability_cell 表的读写
pub struct AvailabilityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AvailabilityRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按省份和日期范围查询格子（闭区间）
    ///
    /// # 返回
    /// - Ok(Vec<AvailabilityCell>): 已存在的格子,按日期、时段排序
    pub fn find_by_date_range(
        &self,
        department: &DepartmentCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<AvailabilityCell>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT department, cell_date, slot_id, capacity, closed
            FROM availability_cell
            WHERE department = ?1
              AND cell_date BETWEEN ?2 AND ?3
            ORDER BY cell_date, slot_id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    department.as_str(),
                    start_date.format(DATE_FMT).to_string(),
                    end_date.format(DATE_FMT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, Option<i32>>(3)?,
                        row.get::<_, i32>(4)? != 0,
                    ))
                },
            )?
            .collect::<SqliteResult<Vec<CellRow>>>()?;

        rows.into_iter().map(cell_from_row).collect()
    }

    /// 写入容量（格子未关闭时）
    ///
    /// 关闭判断与写入在同一条语句中完成
    ///
    /// # 返回
    /// - Ok(true): 已写入
    /// - Ok(false): 格子已关闭,未写入
    pub fn upsert_capacity_if_open(
        &self,
        department: &DepartmentCode,
        date: NaiveDate,
        slot_id: SlotId,
        capacity: i32,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::upsert_capacity_if_open_with(&conn, department, date, slot_id, capacity)
    }

    /// 整天所有未关闭时段写入同一容量（单事务）
    ///
    /// # 返回
    /// - Ok(Vec<SlotId>): 因关闭而跳过的时段
    pub fn upsert_day_capacity_if_open(
        &self,
        department: &DepartmentCode,
        date: NaiveDate,
        capacity: i32,
    ) -> RepositoryResult<Vec<SlotId>> {
        let skipped = self.upsert_days_capacity_if_open(department, &[(date, capacity)])?;
        Ok(skipped.into_iter().map(|(_, slot_id)| slot_id).collect())
    }

    /// 多天按天写入容量（单事务,任一写入失败则全部回滚）
    ///
    /// # 参数
    /// - days: (日期, 该天每个时段的容量)
    ///
    /// # 返回
    /// - Ok(Vec<(NaiveDate, SlotId)>): 因关闭而跳过的格子
    pub fn upsert_days_capacity_if_open(
        &self,
        department: &DepartmentCode,
        days: &[(NaiveDate, i32)],
    ) -> RepositoryResult<Vec<(NaiveDate, SlotId)>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut skipped = Vec::new();
        for &(date, capacity) in days {
            for slot_id in slot_ids() {
                if !Self::upsert_capacity_if_open_with(&tx, department, date, slot_id, capacity)? {
                    skipped.push((date, slot_id));
                }
            }
        }

        tx.commit()?;
        Ok(skipped)
    }

    fn upsert_capacity_if_open_with(
        conn: &Connection,
        department: &DepartmentCode,
        date: NaiveDate,
        slot_id: SlotId,
        capacity: i32,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            r#"
            INSERT INTO availability_cell (department, cell_date, slot_id, capacity, closed, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, datetime('now'))
            ON CONFLICT(department, cell_date, slot_id) DO UPDATE SET
                capacity = excluded.capacity,
                updated_at = excluded.updated_at
            WHERE availability_cell.closed = 0
            "#,
            params![department.as_str(), date.format(DATE_FMT).to_string(), slot_id, capacity],
        )?;

        Ok(affected > 0)
    }

    /// 设置关闭状态（不改变 capacity;格子不存在时以 capacity=NULL 创建）
    pub fn set_closed(
        &self,
        department: &DepartmentCode,
        date: NaiveDate,
        slot_id: SlotId,
        closed: bool,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::set_closed_with(&conn, department, date, slot_id, closed)?;
        Ok(())
    }

    fn set_closed_with(
        conn: &Connection,
        department: &DepartmentCode,
        date: NaiveDate,
        slot_id: SlotId,
        closed: bool,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            INSERT INTO availability_cell (department, cell_date, slot_id, capacity, closed, updated_at)
            VALUES (?1, ?2, ?3, NULL, ?4, datetime('now'))
            ON CONFLICT(department, cell_date, slot_id) DO UPDATE SET
                closed = excluded.closed,
                updated_at = excluded.updated_at
            "#,
            params![
                department.as_str(),
                date.format(DATE_FMT).to_string(),
                slot_id,
                closed as i32
            ],
        )?;
        Ok(affected)
    }

    /// 翻转关闭状态
    ///
    /// # 返回
    /// - Ok(bool): 翻转后的 closed
    pub fn toggle_closed(
        &self,
        department: &DepartmentCode,
        date: NaiveDate,
        slot_id: SlotId,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let date_str = date.format(DATE_FMT).to_string();

        tx.execute(
            r#"
            INSERT INTO availability_cell (department, cell_date, slot_id, capacity, closed, updated_at)
            VALUES (?1, ?2, ?3, NULL, 1, datetime('now'))
            ON CONFLICT(department, cell_date, slot_id) DO UPDATE SET
                closed = 1 - availability_cell.closed,
                updated_at = excluded.updated_at
            "#,
            params![department.as_str(), date_str, slot_id],
        )?;

        let closed: i32 = tx.query_row(
            "SELECT closed FROM availability_cell WHERE department = ?1 AND cell_date = ?2 AND slot_id = ?3",
            params![department.as_str(), date_str, slot_id],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(closed != 0)
    }

    /// 整天关闭/开放切换（单事务）
    ///
    /// 六个时段已全部关闭时全部开放,否则全部关闭
    ///
    /// # 返回
    /// - Ok(bool): 切换后的 closed
    pub fn toggle_day_closed(
        &self,
        department: &DepartmentCode,
        date: NaiveDate,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let closed_slots: u32 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM availability_cell
            WHERE department = ?1 AND cell_date = ?2 AND closed = 1
            "#,
            params![department.as_str(), date.format(DATE_FMT).to_string()],
            |row| row.get(0),
        )?;
        let closed = (closed_slots as usize) < TIME_SLOTS.len();

        for slot_id in slot_ids() {
            Self::set_closed_with(&tx, department, date, slot_id, closed)?;
        }

        tx.commit()?;
        Ok(closed)
    }

    /// 用给定格子整体替换省份在日期范围内的格子（单事务）
    ///
    /// 范围内不在 cells 中的格子会被删除
    pub fn replace_range(
        &self,
        department: &DepartmentCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cells: &[AvailabilityCell],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            DELETE FROM availability_cell
            WHERE department = ?1 AND cell_date BETWEEN ?2 AND ?3
            "#,
            params![
                department.as_str(),
                start_date.format(DATE_FMT).to_string(),
                end_date.format(DATE_FMT).to_string()
            ],
        )?;

        let mut written = 0;
        for cell in cells {
            if cell.department != *department || cell.date < start_date || cell.date > end_date {
                return Err(RepositoryError::InternalError(format!(
                    "格子超出替换范围: {} {} {}",
                    cell.department, cell.date, cell.slot_id
                )));
            }
            written += tx.execute(
                r#"
                INSERT INTO availability_cell (department, cell_date, slot_id, capacity, closed, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                "#,
                params![
                    cell.department.as_str(),
                    cell.date.format(DATE_FMT).to_string(),
                    cell.slot_id,
                    cell.capacity,
                    cell.closed as i32
                ],
            )?;
        }

        tx.commit()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup() -> AvailabilityRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        AvailabilityRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn dept() -> DepartmentCode {
        DepartmentCode::parse("75").unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn cell_at(repo: &AvailabilityRepository, date: NaiveDate, slot_id: SlotId) -> Option<AvailabilityCell> {
        repo.find_by_date_range(&dept(), date, date)
            .unwrap()
            .into_iter()
            .find(|c| c.slot_id == slot_id)
    }

    fn day_capacities(repo: &AvailabilityRepository, date: NaiveDate) -> Vec<Option<i32>> {
        slot_ids()
            .map(|slot_id| cell_at(repo, date, slot_id).and_then(|c| c.capacity))
            .collect()
    }

    #[test]
    fn test_upsert_capacity_关闭时不写入() {
        let repo = setup();
        assert!(repo.upsert_capacity_if_open(&dept(), monday(), 32400, 4).unwrap());
        repo.set_closed(&dept(), monday(), 32400, true).unwrap();
        assert!(!repo.upsert_capacity_if_open(&dept(), monday(), 32400, 9).unwrap());

        let cell = cell_at(&repo, monday(), 32400).unwrap();
        assert_eq!(cell.capacity, Some(4));
        assert!(cell.closed);
    }

    #[test]
    fn test_toggle_closed_不存在的格子() {
        let repo = setup();
        assert!(repo.toggle_closed(&dept(), monday(), 39600).unwrap());
        let cell = cell_at(&repo, monday(), 39600).unwrap();
        assert_eq!(cell.capacity, None);
        assert!(!repo.toggle_closed(&dept(), monday(), 39600).unwrap());
    }

    #[test]
    fn test_replace_range_删除多余格子() {
        let repo = setup();
        repo.upsert_capacity_if_open(&dept(), monday(), 32400, 1).unwrap();
        repo.upsert_capacity_if_open(&dept(), monday(), 39600, 2).unwrap();

        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let cells = vec![AvailabilityCell {
            department: dept(),
            date: friday,
            slot_id: 46800,
            capacity: Some(3),
            closed: true,
        }];
        repo.replace_range(&dept(), monday(), friday, &cells).unwrap();

        let found = repo.find_by_date_range(&dept(), monday(), friday).unwrap();
        assert_eq!(found, cells);
    }

    #[test]
    fn test_upsert_day_capacity_跳过关闭时段() {
        let repo = setup();
        repo.set_closed(&dept(), monday(), 46800, true).unwrap();

        let skipped = repo.upsert_day_capacity_if_open(&dept(), monday(), 7).unwrap();
        assert_eq!(skipped, vec![46800]);
        assert_eq!(
            day_capacities(&repo, monday()),
            vec![Some(7), Some(7), None, Some(7), Some(7), Some(7)]
        );
    }

    #[test]
    fn test_upsert_days_capacity_写入失败整体回滚() {
        let repo = setup();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        repo.upsert_capacity_if_open(&dept(), monday(), 32400, 1).unwrap();
        {
            let conn = repo.conn.lock().unwrap();
            conn.execute_batch(
                r#"
                CREATE TRIGGER reject_evening BEFORE INSERT ON availability_cell
                WHEN NEW.slot_id = 57600 AND NEW.cell_date = '2024-03-05'
                BEGIN
                    SELECT RAISE(ABORT, 'rejected');
                END;
                "#,
            )
            .unwrap();
        }

        assert!(repo
            .upsert_days_capacity_if_open(&dept(), &[(monday(), 4), (tuesday, 4)])
            .is_err());
        assert_eq!(
            day_capacities(&repo, monday()),
            vec![Some(1), None, None, None, None, None]
        );
        assert_eq!(day_capacities(&repo, tuesday), vec![None; 6]);

        assert!(repo.upsert_day_capacity_if_open(&dept(), tuesday, 4).is_err());
        assert_eq!(day_capacities(&repo, tuesday), vec![None; 6]);
    }

    #[test]
    fn test_toggle_day_closed_全关则全开() {
        let repo = setup();
        repo.set_closed(&dept(), monday(), 32400, true).unwrap();

        // 部分关闭 → 全部关闭
        assert!(repo.toggle_day_closed(&dept(), monday()).unwrap());
        assert!(slot_ids().all(|id| cell_at(&repo, monday(), id).unwrap().closed));

        // 全部关闭 → 全部开放
        assert!(!repo.toggle_day_closed(&dept(), monday()).unwrap());
        assert!(slot_ids().all(|id| !cell_at(&repo, monday(), id).unwrap().closed));
    }
}
