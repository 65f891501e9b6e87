// ==========================================
// 养殖批次运营核心 - 投喂数据仓储
// ==========================================
// 职责: 饲料/库存/投喂事件持久化
// 约束: 投喂事件与库存扣减同事务提交
// ==========================================

use crate::domain::feeding::{Feed, FeedStock, FeedingEvent};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_date, get_date};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const EVENT_COLUMNS: &str = "event_id, batch_id, assignment_id, container_id, feed_id, feed_stock_id, \
     feeding_date, amount_kg, batch_biomass_kg, feeding_percentage, notes";

pub struct FeedingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FeedingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 饲料 =====

    pub fn insert_feed(&self, feed: &Feed) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO feed (feed_id, name, brand, size_category) VALUES (?, ?, ?, ?)",
            params![&feed.feed_id, &feed.name, &feed.brand, &feed.size_category],
        )?;
        Ok(())
    }

    pub fn find_feed(&self, feed_id: &str) -> RepositoryResult<Option<Feed>> {
        let conn = self.get_conn()?;
        let feed = conn
            .query_row(
                "SELECT feed_id, name, brand, size_category FROM feed WHERE feed_id = ?",
                params![feed_id],
                |row| {
                    Ok(Feed {
                        feed_id: row.get(0)?,
                        name: row.get(1)?,
                        brand: row.get(2)?,
                        size_category: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(feed)
    }

    // ===== 库存 =====

    pub fn insert_stock(&self, stock: &FeedStock) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO feed_stock (stock_id, feed_id, feed_container_id, quantity_kg, reorder_threshold_kg)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &stock.stock_id,
                &stock.feed_id,
                &stock.feed_container_id,
                stock.quantity_kg,
                stock.reorder_threshold_kg,
            ],
        )?;
        Ok(())
    }

    pub fn find_stock(&self, stock_id: &str) -> RepositoryResult<Option<FeedStock>> {
        let conn = self.get_conn()?;
        let stock = conn
            .query_row(
                r#"SELECT stock_id, feed_id, feed_container_id, quantity_kg, reorder_threshold_kg
                   FROM feed_stock WHERE stock_id = ?"#,
                params![stock_id],
                |row| {
                    Ok(FeedStock {
                        stock_id: row.get(0)?,
                        feed_id: row.get(1)?,
                        feed_container_id: row.get(2)?,
                        quantity_kg: row.get(3)?,
                        reorder_threshold_kg: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(stock)
    }

    // ===== 投喂事件 =====

    /// 写入投喂事件; 指定库存时在同一事务内扣减
    ///
    /// 扣减为条件更新, 余量不足 (含并发扣减) 时整体回滚
    pub fn insert_event(&self, event: &FeedingEvent) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO feeding_event ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                EVENT_COLUMNS
            ),
            params![
                &event.event_id,
                &event.batch_id,
                &event.assignment_id,
                &event.container_id,
                &event.feed_id,
                &event.feed_stock_id,
                fmt_date(event.feeding_date),
                event.amount_kg,
                event.batch_biomass_kg,
                event.feeding_percentage,
                &event.notes,
            ],
        )?;

        if let Some(stock_id) = &event.feed_stock_id {
            let affected = tx.execute(
                r#"UPDATE feed_stock
                   SET quantity_kg = ROUND(quantity_kg - ?1, 3)
                   WHERE stock_id = ?2 AND quantity_kg >= ?1"#,
                params![event.amount_kg, stock_id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "库存不足或不存在: stock_id={}",
                    stock_id
                )));
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<FeedingEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeding_event WHERE batch_id = ? ORDER BY feeding_date, event_id",
            EVENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![batch_id], map_event_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 日期闭区间内的全部投喂事件
    pub fn find_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepositoryResult<Vec<FeedingEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeding_event WHERE feeding_date BETWEEN ? AND ? ORDER BY feeding_date, event_id",
            EVENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![fmt_date(start), fmt_date(end)], map_event_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_event_row(row: &rusqlite::Row) -> rusqlite::Result<FeedingEvent> {
    Ok(FeedingEvent {
        event_id: row.get(0)?,
        batch_id: row.get(1)?,
        assignment_id: row.get(2)?,
        container_id: row.get(3)?,
        feed_id: row.get(4)?,
        feed_stock_id: row.get(5)?,
        feeding_date: get_date(row, 6)?,
        amount_kg: row.get(7)?,
        batch_biomass_kg: row.get(8)?,
        feeding_percentage: row.get(9)?,
        notes: row.get(10)?,
    })
}
