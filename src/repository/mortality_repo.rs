// ==========================================
// 养殖批次运营核心 - 死亡事件数据仓储
// ==========================================
// 职责: mortality_event 持久化
// 约束: 分配读取、死亡事件写入与数量扣减同一写事务 (持有连接锁)
// ==========================================

use crate::domain::batch::ContainerAssignment;
use crate::domain::mortality::MortalityEvent;
use crate::domain::types::MortalityCause;
use crate::repository::batch_repo::{find_active_by_batch_in, find_assignment_in, update_assignment_in};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_date, get_date};
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

const EVENT_COLUMNS: &str =
    "event_id, batch_id, assignment_id, container_id, event_date, count, biomass_kg, cause, description";

pub struct MortalityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MortalityRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 分配级死亡: 读取分配, 由 `apply` 校验扣减并生成事件, 事件与扣减同事务提交
    pub fn record_for_assignment<E, F>(&self, assignment_id: &str, apply: F) -> Result<MortalityEvent, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut ContainerAssignment) -> Result<MortalityEvent, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let mut assignment = find_assignment_in(&tx, assignment_id)?
            .ok_or_else(|| RepositoryError::not_found("ContainerAssignment", assignment_id))?;
        let event = apply(&mut assignment)?;
        insert_event_in(&tx, &event)?;
        update_assignment_in(&tx, &assignment)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok(event)
    }

    /// 批次级死亡: 读取批次全部活跃分配, 由 `apply` 分摊扣减并生成事件, 同事务提交
    pub fn record_for_batch<E, F>(&self, batch_id: &str, apply: F) -> Result<MortalityEvent, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut [ContainerAssignment]) -> Result<MortalityEvent, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let mut assignments = find_active_by_batch_in(&tx, batch_id)?;
        let event = apply(&mut assignments)?;
        insert_event_in(&tx, &event)?;
        for assignment in &assignments {
            update_assignment_in(&tx, assignment)?;
        }
        tx.commit().map_err(RepositoryError::from)?;
        Ok(event)
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<MortalityEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM mortality_event WHERE batch_id = ? ORDER BY event_date, event_id",
            EVENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![batch_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 地域内的死亡事件 (经容器关联, 按日期闭区间)
    pub fn find_by_geography(
        &self,
        geography_id: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> RepositoryResult<Vec<MortalityEvent>> {
        let conn = self.get_conn()?;
        let columns = EVENT_COLUMNS
            .split(", ")
            .map(|c| format!("m.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM mortality_event m
             LEFT JOIN container_assignment a ON a.assignment_id = m.assignment_id
             JOIN container c ON c.container_id = COALESCE(m.container_id, a.container_id)
             WHERE c.geography_id = ? AND m.event_date BETWEEN ? AND ?
             ORDER BY m.event_date, m.event_id",
            columns
        ))?;
        let rows = stmt
            .query_map(params![geography_id, fmt_date(start), fmt_date(end)], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn insert_event_in(conn: &Connection, e: &MortalityEvent) -> RepositoryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO mortality_event ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            EVENT_COLUMNS
        ),
        params![
            &e.event_id,
            &e.batch_id,
            &e.assignment_id,
            &e.container_id,
            fmt_date(e.event_date),
            e.count,
            e.biomass_kg,
            e.cause.to_db_str(),
            &e.description,
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<MortalityEvent> {
    Ok(MortalityEvent {
        event_id: row.get(0)?,
        batch_id: row.get(1)?,
        assignment_id: row.get(2)?,
        container_id: row.get(3)?,
        event_date: get_date(row, 4)?,
        count: row.get(5)?,
        biomass_kg: row.get(6)?,
        cause: MortalityCause::from_str(&row.get::<_, String>(7)?),
        description: row.get(8)?,
    })
}
