// ==========================================
// 养殖批次运营核心 - 批次数据仓储
// ==========================================
// 职责: 物种/生命阶段/批次/容器分配的持久化
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::batch::{Batch, ContainerAssignment, LifecycleStage, Species};
use crate::domain::types::{BatchStatus, BatchType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_opt_date, get_date, get_datetime, get_opt_date,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = "batch_id, batch_number, species_id, lifecycle_stage_id, status, batch_type, \
     start_date, expected_end_date, actual_end_date, notes, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "assignment_id, batch_id, container_id, lifecycle_stage_id, population_count, \
     avg_weight_g, biomass_kg, assignment_date, departure_date, is_active, notes";

// ==========================================
// SpeciesRepository - 物种与生命阶段仓储
// ==========================================
pub struct SpeciesRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SpeciesRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_species(&self, species: &Species) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO species (species_id, name, scientific_name) VALUES (?, ?, ?)",
            params![&species.species_id, &species.name, &species.scientific_name],
        )?;
        Ok(())
    }

    pub fn find_species(&self, species_id: &str) -> RepositoryResult<Option<Species>> {
        let conn = self.get_conn()?;
        let species = conn
            .query_row(
                "SELECT species_id, name, scientific_name FROM species WHERE species_id = ?",
                params![species_id],
                |row| {
                    Ok(Species {
                        species_id: row.get(0)?,
                        name: row.get(1)?,
                        scientific_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(species)
    }

    pub fn insert_stage(&self, stage: &LifecycleStage) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO lifecycle_stage (stage_id, species_id, name, stage_order) VALUES (?, ?, ?, ?)",
            params![&stage.stage_id, &stage.species_id, &stage.name, stage.stage_order],
        )?;
        Ok(())
    }

    pub fn find_stage(&self, stage_id: &str) -> RepositoryResult<Option<LifecycleStage>> {
        let conn = self.get_conn()?;
        let stage = conn
            .query_row(
                "SELECT stage_id, species_id, name, stage_order FROM lifecycle_stage WHERE stage_id = ?",
                params![stage_id],
                map_stage_row,
            )
            .optional()?;
        Ok(stage)
    }

    /// 物种的生命阶段, 按 stage_order 升序
    pub fn list_stages(&self, species_id: &str) -> RepositoryResult<Vec<LifecycleStage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT stage_id, species_id, name, stage_order FROM lifecycle_stage
             WHERE species_id = ? ORDER BY stage_order",
        )?;
        let stages = stmt
            .query_map(params![species_id], map_stage_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stages)
    }
}

fn map_stage_row(row: &rusqlite::Row) -> rusqlite::Result<LifecycleStage> {
    Ok(LifecycleStage {
        stage_id: row.get(0)?,
        species_id: row.get(1)?,
        name: row.get(2)?,
        stage_order: row.get(3)?,
    })
}

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, batch: &Batch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO batch ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                BATCH_COLUMNS
            ),
            params![
                &batch.batch_id,
                &batch.batch_number,
                &batch.species_id,
                &batch.lifecycle_stage_id,
                batch.status.to_db_str(),
                batch.batch_type.to_db_str(),
                fmt_date(batch.start_date),
                fmt_opt_date(batch.expected_end_date),
                fmt_opt_date(batch.actual_end_date),
                &batch.notes,
                fmt_datetime(batch.created_at),
                fmt_datetime(batch.updated_at),
            ],
        )?;
        Ok(batch.batch_id.clone())
    }

    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        find_batch_in(&conn, batch_id)
    }

    pub fn find_by_number(&self, batch_number: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM batch WHERE batch_number = ?", BATCH_COLUMNS),
                params![batch_number],
                map_batch_row,
            )
            .optional()?;
        Ok(batch)
    }

    pub fn list_by_status(&self, status: BatchStatus) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM batch WHERE status = ? ORDER BY start_date, batch_number",
            BATCH_COLUMNS
        ))?;
        let batches = stmt
            .query_map(params![status.to_db_str()], map_batch_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    pub fn update(&self, batch: &Batch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_batch_in(&conn, batch)
    }
}

pub(crate) fn find_batch_in(conn: &Connection, batch_id: &str) -> RepositoryResult<Option<Batch>> {
    let batch = conn
        .query_row(
            &format!("SELECT {} FROM batch WHERE batch_id = ?", BATCH_COLUMNS),
            params![batch_id],
            map_batch_row,
        )
        .optional()?;
    Ok(batch)
}

/// 更新批次 (可在事务内调用)
pub(crate) fn update_batch_in(conn: &Connection, batch: &Batch) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"UPDATE batch
           SET lifecycle_stage_id = ?, status = ?, batch_type = ?, expected_end_date = ?,
               actual_end_date = ?, notes = ?, updated_at = ?
           WHERE batch_id = ?"#,
        params![
            &batch.lifecycle_stage_id,
            batch.status.to_db_str(),
            batch.batch_type.to_db_str(),
            fmt_opt_date(batch.expected_end_date),
            fmt_opt_date(batch.actual_end_date),
            &batch.notes,
            fmt_datetime(batch.updated_at),
            &batch.batch_id,
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::not_found("Batch", &batch.batch_id));
    }
    Ok(())
}

fn map_batch_row(row: &rusqlite::Row) -> rusqlite::Result<Batch> {
    Ok(Batch {
        batch_id: row.get(0)?,
        batch_number: row.get(1)?,
        species_id: row.get(2)?,
        lifecycle_stage_id: row.get(3)?,
        status: BatchStatus::from_str(&row.get::<_, String>(4)?),
        batch_type: BatchType::from_str(&row.get::<_, String>(5)?),
        start_date: get_date(row, 6)?,
        expected_end_date: get_opt_date(row, 7)?,
        actual_end_date: get_opt_date(row, 8)?,
        notes: row.get(9)?,
        created_at: get_datetime(row, 10)?,
        updated_at: get_datetime(row, 11)?,
    })
}

// ==========================================
// AssignmentRepository - 容器分配仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, assignment: &ContainerAssignment) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_assignment_in(&conn, assignment)?;
        Ok(assignment.assignment_id.clone())
    }

    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<ContainerAssignment>> {
        let conn = self.get_conn()?;
        find_assignment_in(&conn, assignment_id)
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<ContainerAssignment>> {
        self.query_list(
            &format!(
                "SELECT {} FROM container_assignment WHERE batch_id = ? ORDER BY assignment_date, assignment_id",
                ASSIGNMENT_COLUMNS
            ),
            batch_id,
        )
    }

    pub fn find_active_by_container(&self, container_id: &str) -> RepositoryResult<Vec<ContainerAssignment>> {
        self.query_list(
            &format!(
                "SELECT {} FROM container_assignment WHERE container_id = ? AND is_active = 1 ORDER BY assignment_id",
                ASSIGNMENT_COLUMNS
            ),
            container_id,
        )
    }

    /// 批次在某容器中尚未离池的分配 (鱼卵入池复用)
    pub fn find_open_for_batch_container(
        &self,
        batch_id: &str,
        container_id: &str,
    ) -> RepositoryResult<Option<ContainerAssignment>> {
        let conn = self.get_conn()?;
        find_open_assignment_in(&conn, batch_id, container_id)
    }

    /// 地域内全部分配 (经容器关联)
    pub fn find_by_geography(&self, geography_id: &str) -> RepositoryResult<Vec<ContainerAssignment>> {
        let columns = ASSIGNMENT_COLUMNS
            .split(", ")
            .map(|c| format!("a.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        self.query_list(
            &format!(
                "SELECT {} FROM container_assignment a
                 JOIN container c ON c.container_id = a.container_id
                 WHERE c.geography_id = ? ORDER BY a.assignment_id",
                columns
            ),
            geography_id,
        )
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ContainerAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM container_assignment ORDER BY assignment_id",
            ASSIGNMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 容器内活跃分配的生物量合计 (可排除一条分配)
    pub fn active_biomass_in_container(
        &self,
        container_id: &str,
        exclude_assignment_id: Option<&str>,
    ) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        active_biomass_in_container_in(&conn, container_id, exclude_assignment_id)
    }

    /// 批次当前在养数量 (活跃分配之和)
    pub fn current_population(&self, batch_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(population_count), 0) FROM container_assignment
             WHERE batch_id = ? AND is_active = 1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn update(&self, assignment: &ContainerAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_assignment_in(&conn, assignment)
    }

    /// 分配读取-修改-写回 (持有连接锁, 单写事务)
    ///
    /// `apply` 返回 Err 时事务回滚, 分配保持原值
    pub fn modify<T, E, F>(&self, assignment_id: &str, apply: F) -> Result<(T, ContainerAssignment), E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&Connection, &mut ContainerAssignment) -> Result<T, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let mut assignment = find_assignment_in(&tx, assignment_id)?
            .ok_or_else(|| RepositoryError::not_found("ContainerAssignment", assignment_id))?;
        let result = apply(&tx, &mut assignment)?;
        update_assignment_in(&tx, &assignment)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok((result, assignment))
    }

    fn query_list(&self, sql: &str, key: &str) -> RepositoryResult<Vec<ContainerAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key], map_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub(crate) fn insert_assignment_in(conn: &Connection, a: &ContainerAssignment) -> RepositoryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO container_assignment ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ASSIGNMENT_COLUMNS
        ),
        params![
            &a.assignment_id,
            &a.batch_id,
            &a.container_id,
            &a.lifecycle_stage_id,
            a.population_count,
            a.avg_weight_g,
            a.biomass_kg,
            fmt_date(a.assignment_date),
            fmt_opt_date(a.departure_date),
            a.is_active,
            &a.notes,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_assignment_in(
    conn: &Connection,
    assignment_id: &str,
) -> RepositoryResult<Option<ContainerAssignment>> {
    let assignment = conn
        .query_row(
            &format!(
                "SELECT {} FROM container_assignment WHERE assignment_id = ?",
                ASSIGNMENT_COLUMNS
            ),
            params![assignment_id],
            map_assignment_row,
        )
        .optional()?;
    Ok(assignment)
}

/// 批次的活跃分配 (按分配日期)
pub(crate) fn find_active_by_batch_in(conn: &Connection, batch_id: &str) -> RepositoryResult<Vec<ContainerAssignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM container_assignment WHERE batch_id = ? AND is_active = 1
         ORDER BY assignment_date, assignment_id",
        ASSIGNMENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![batch_id], map_assignment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn find_open_assignment_in(
    conn: &Connection,
    batch_id: &str,
    container_id: &str,
) -> RepositoryResult<Option<ContainerAssignment>> {
    let assignment = conn
        .query_row(
            &format!(
                "SELECT {} FROM container_assignment
                 WHERE batch_id = ? AND container_id = ? AND departure_date IS NULL
                 ORDER BY assignment_date DESC LIMIT 1",
                ASSIGNMENT_COLUMNS
            ),
            params![batch_id, container_id],
            map_assignment_row,
        )
        .optional()?;
    Ok(assignment)
}

pub(crate) fn active_biomass_in_container_in(
    conn: &Connection,
    container_id: &str,
    exclude_assignment_id: Option<&str>,
) -> RepositoryResult<f64> {
    let total: f64 = conn.query_row(
        r#"SELECT COALESCE(SUM(biomass_kg), 0)
           FROM container_assignment
           WHERE container_id = ?1 AND is_active = 1
             AND (?2 IS NULL OR assignment_id <> ?2)"#,
        params![container_id, exclude_assignment_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// 更新分配 (可在事务内调用)
pub(crate) fn update_assignment_in(conn: &Connection, a: &ContainerAssignment) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"UPDATE container_assignment
           SET lifecycle_stage_id = ?, population_count = ?, avg_weight_g = ?, biomass_kg = ?,
               departure_date = ?, is_active = ?, notes = ?
           WHERE assignment_id = ?"#,
        params![
            &a.lifecycle_stage_id,
            a.population_count,
            a.avg_weight_g,
            a.biomass_kg,
            fmt_opt_date(a.departure_date),
            a.is_active,
            &a.notes,
            &a.assignment_id,
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::not_found("ContainerAssignment", &a.assignment_id));
    }
    Ok(())
}

fn map_assignment_row(row: &rusqlite::Row) -> rusqlite::Result<ContainerAssignment> {
    Ok(ContainerAssignment {
        assignment_id: row.get(0)?,
        batch_id: row.get(1)?,
        container_id: row.get(2)?,
        lifecycle_stage_id: row.get(3)?,
        population_count: row.get(4)?,
        avg_weight_g: row.get(5)?,
        biomass_kg: row.get(6)?,
        assignment_date: get_date(row, 7)?,
        departure_date: get_opt_date(row, 8)?,
        is_active: row.get(9)?,
        notes: row.get(10)?,
    })
}
