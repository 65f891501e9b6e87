// ==========================================
// 养殖批次运营核心 - 容器数据仓储
// ==========================================

use crate::domain::batch::Container;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const CONTAINER_COLUMNS: &str =
    "container_id, name, container_type, geography_id, area_id, max_biomass_kg, active";

pub struct ContainerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContainerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, container: &Container) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO container ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                CONTAINER_COLUMNS
            ),
            params![
                &container.container_id,
                &container.name,
                &container.container_type,
                &container.geography_id,
                &container.area_id,
                container.max_biomass_kg,
                container.active,
            ],
        )?;
        Ok(container.container_id.clone())
    }

    pub fn find_by_id(&self, container_id: &str) -> RepositoryResult<Option<Container>> {
        let conn = self.get_conn()?;
        find_container_in(&conn, container_id)
    }

    pub fn list_by_geography(&self, geography_id: &str) -> RepositoryResult<Vec<Container>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM container WHERE geography_id = ? ORDER BY name",
            CONTAINER_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![geography_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Container>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM container ORDER BY geography_id, name",
            CONTAINER_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub(crate) fn find_container_in(conn: &Connection, container_id: &str) -> RepositoryResult<Option<Container>> {
    let container = conn
        .query_row(
            &format!("SELECT {} FROM container WHERE container_id = ?", CONTAINER_COLUMNS),
            params![container_id],
            map_row,
        )
        .optional()?;
    Ok(container)
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Container> {
    Ok(Container {
        container_id: row.get(0)?,
        name: row.get(1)?,
        container_type: row.get(2)?,
        geography_id: row.get(3)?,
        area_id: row.get(4)?,
        max_biomass_kg: row.get(5)?,
        active: row.get(6)?,
    })
}
