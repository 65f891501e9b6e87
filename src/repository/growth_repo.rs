// ==========================================
// 养殖批次运营核心 - 生长抽样数据仓储
// ==========================================
// 职责: growth_sample 持久化, 批量导入在单事务内完成
// ==========================================

use crate::domain::growth::GrowthSample;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_date, get_date};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SAMPLE_COLUMNS: &str = "sample_id, assignment_id, sample_date, sample_size, avg_weight_g, avg_length_cm, \
     std_deviation_weight, std_deviation_length, condition_factor, notes";

pub struct GrowthSampleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GrowthSampleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, sample: &GrowthSample) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_sample_in(&conn, sample)?;
        Ok(sample.sample_id.clone())
    }

    /// 批量插入 (单事务, 任一失败整体回滚)
    pub fn batch_insert(&self, samples: &[GrowthSample]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for sample in samples {
            insert_sample_in(&tx, sample)?;
        }
        tx.commit()?;
        Ok(samples.len())
    }

    /// 批次全部抽样 (经分配关联), 按日期升序
    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<GrowthSample>> {
        let columns = SAMPLE_COLUMNS
            .split(", ")
            .map(|c| format!("s.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        self.query_list(
            &format!(
                "SELECT {} FROM growth_sample s
                 JOIN container_assignment a ON a.assignment_id = s.assignment_id
                 WHERE a.batch_id = ? ORDER BY s.sample_date, s.sample_id",
                columns
            ),
            batch_id,
        )
    }

    pub fn find_by_assignment(&self, assignment_id: &str) -> RepositoryResult<Vec<GrowthSample>> {
        self.query_list(
            &format!(
                "SELECT {} FROM growth_sample WHERE assignment_id = ? ORDER BY sample_date, sample_id",
                SAMPLE_COLUMNS
            ),
            assignment_id,
        )
    }

    fn query_list(&self, sql: &str, key: &str) -> RepositoryResult<Vec<GrowthSample>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn insert_sample_in(conn: &Connection, s: &GrowthSample) -> RepositoryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO growth_sample ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SAMPLE_COLUMNS
        ),
        params![
            &s.sample_id,
            &s.assignment_id,
            fmt_date(s.sample_date),
            s.sample_size,
            s.avg_weight_g,
            s.avg_length_cm,
            s.std_deviation_weight,
            s.std_deviation_length,
            s.condition_factor,
            &s.notes,
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<GrowthSample> {
    Ok(GrowthSample {
        sample_id: row.get(0)?,
        assignment_id: row.get(1)?,
        sample_date: get_date(row, 2)?,
        sample_size: row.get(3)?,
        avg_weight_g: row.get(4)?,
        avg_length_cm: row.get(5)?,
        std_deviation_weight: row.get(6)?,
        std_deviation_length: row.get(7)?,
        condition_factor: row.get(8)?,
        notes: row.get(9)?,
    })
}
