// ==========================================
// 养殖批次运营核心 - 情景模型数据仓储
// ==========================================
// 职责: scenario / scenario_projection 持久化 (FCR 预测口径)
// ==========================================

use crate::domain::scenario::{Scenario, ScenarioProjection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_date, get_date};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ScenarioRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScenarioRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入情景及其日投影 (单事务; 同一情景重复写入时替换投影)
    pub fn save_with_projections(
        &self,
        scenario: &Scenario,
        projections: &[ScenarioProjection],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO scenario (
                scenario_id, name, batch_id, start_date, duration_days, initial_count, initial_weight_g
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(scenario_id) DO UPDATE SET
                name = excluded.name,
                batch_id = excluded.batch_id,
                start_date = excluded.start_date,
                duration_days = excluded.duration_days,
                initial_count = excluded.initial_count,
                initial_weight_g = excluded.initial_weight_g"#,
            params![
                &scenario.scenario_id,
                &scenario.name,
                &scenario.batch_id,
                fmt_date(scenario.start_date),
                scenario.duration_days,
                scenario.initial_count,
                scenario.initial_weight_g,
            ],
        )?;

        tx.execute(
            "DELETE FROM scenario_projection WHERE scenario_id = ?",
            params![&scenario.scenario_id],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO scenario_projection (
                    scenario_id, projection_date, day_number, average_weight_g, population,
                    biomass_kg, daily_feed_kg, cumulative_feed_kg
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;
            for p in projections {
                stmt.execute(params![
                    &scenario.scenario_id,
                    fmt_date(p.projection_date),
                    p.day_number,
                    p.average_weight_g,
                    p.population,
                    p.biomass_kg,
                    p.daily_feed_kg,
                    p.cumulative_feed_kg,
                ])?;
            }
        }

        tx.commit()?;
        Ok(projections.len())
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<Scenario>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT scenario_id, name, batch_id, start_date, duration_days, initial_count, initial_weight_g
               FROM scenario WHERE batch_id = ? ORDER BY start_date, scenario_id"#,
        )?;
        let rows = stmt
            .query_map(params![batch_id], |row| {
                Ok(Scenario {
                    scenario_id: row.get(0)?,
                    name: row.get(1)?,
                    batch_id: row.get(2)?,
                    start_date: get_date(row, 3)?,
                    duration_days: row.get(4)?,
                    initial_count: row.get(5)?,
                    initial_weight_g: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_projections(&self, scenario_id: &str) -> RepositoryResult<Vec<ScenarioProjection>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT scenario_id, projection_date, day_number, average_weight_g, population,
                      biomass_kg, daily_feed_kg, cumulative_feed_kg
               FROM scenario_projection WHERE scenario_id = ? ORDER BY day_number"#,
        )?;
        let rows = stmt
            .query_map(params![scenario_id], |row| {
                Ok(ScenarioProjection {
                    scenario_id: row.get(0)?,
                    projection_date: get_date(row, 1)?,
                    day_number: row.get(2)?,
                    average_weight_g: row.get(3)?,
                    population: row.get(4)?,
                    biomass_kg: row.get(5)?,
                    daily_feed_kg: row.get(6)?,
                    cumulative_feed_kg: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
