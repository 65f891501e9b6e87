// ==========================================
// 养殖批次运营核心 - 批次创建工作流数据仓储
// ==========================================
// 职责: batch_creation_workflow / creation_action 持久化
// 约束: 追加/计划/执行/取消均在单写事务内完成读取与写回 (持有连接锁)
// ==========================================

use crate::domain::batch::{Batch, ContainerAssignment};
use crate::domain::types::{ActionStatus, DeliveryMethod, EggSourceType, WorkflowStatus};
use crate::domain::workflow::{BatchCreationWorkflow, CreationAction};
use crate::repository::batch_repo::{
    find_assignment_in, find_batch_in, find_open_assignment_in, insert_assignment_in, update_assignment_in,
    update_batch_in,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_opt_date, fmt_opt_datetime, get_date, get_datetime, get_opt_date,
    get_opt_datetime,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const WORKFLOW_COLUMNS: &str = "workflow_id, workflow_number, batch_id, status, egg_source_type, \
     egg_production_id, external_supplier_id, external_supplier_batch_number, \
     total_eggs_planned, total_eggs_received, total_mortality_on_arrival, total_actions, \
     actions_completed, progress_percentage, planned_start_date, planned_completion_date, \
     actual_start_date, actual_completion_date, cancelled_at, cancelled_by, cancellation_reason, \
     created_by, created_at, updated_at, notes";

const ACTION_COLUMNS: &str = "action_id, workflow_id, action_number, status, dest_assignment_id, \
     egg_count_planned, expected_delivery_date, actual_delivery_date, mortality_on_arrival, \
     delivery_method, water_temp_on_arrival, executed_by, executed_at, notes";

pub struct WorkflowRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkflowRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 工作流 =====

    pub fn insert(&self, workflow: &BatchCreationWorkflow) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO batch_creation_workflow ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
                )",
                WORKFLOW_COLUMNS
            ),
            params![
                &workflow.workflow_id,
                &workflow.workflow_number,
                &workflow.batch_id,
                workflow.status.to_db_str(),
                workflow.egg_source_type.to_db_str(),
                &workflow.egg_production_id,
                &workflow.external_supplier_id,
                &workflow.external_supplier_batch_number,
                workflow.total_eggs_planned,
                workflow.total_eggs_received,
                workflow.total_mortality_on_arrival,
                workflow.total_actions,
                workflow.actions_completed,
                workflow.progress_percentage,
                fmt_opt_date(workflow.planned_start_date),
                fmt_opt_date(workflow.planned_completion_date),
                fmt_opt_date(workflow.actual_start_date),
                fmt_opt_date(workflow.actual_completion_date),
                fmt_opt_datetime(workflow.cancelled_at),
                &workflow.cancelled_by,
                &workflow.cancellation_reason,
                &workflow.created_by,
                fmt_datetime(workflow.created_at),
                fmt_datetime(workflow.updated_at),
                &workflow.notes,
            ],
        )?;
        Ok(workflow.workflow_id.clone())
    }

    pub fn find_by_id(&self, workflow_id: &str) -> RepositoryResult<Option<BatchCreationWorkflow>> {
        let conn = self.get_conn()?;
        find_workflow_in(&conn, workflow_id)
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<BatchCreationWorkflow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM batch_creation_workflow WHERE batch_id = ? ORDER BY created_at",
            WORKFLOW_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![batch_id], map_workflow_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 下一个工作流编号: {prefix}-{year}-{seq:03}
    pub fn next_workflow_number(&self, prefix: &str, year: i32) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let stem = format!("{}-{}-", prefix, year);
        let mut stmt = conn.prepare(
            "SELECT workflow_number FROM batch_creation_workflow WHERE workflow_number LIKE ? || '%'",
        )?;
        let existing = stmt
            .query_map(params![&stem], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        let max_seq = existing
            .iter()
            .filter_map(|n| n.strip_prefix(&stem))
            .filter_map(|s| s.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{}{:03}", stem, max_seq + 1))
    }

    // ===== 动作 =====

    pub fn find_action(&self, action_id: &str) -> RepositoryResult<Option<CreationAction>> {
        let conn = self.get_conn()?;
        find_action_in(&conn, action_id)
    }

    pub fn list_actions(&self, workflow_id: &str) -> RepositoryResult<Vec<CreationAction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM creation_action WHERE workflow_id = ? ORDER BY action_number",
            ACTION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![workflow_id], map_action_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 追加动作 (单写事务)
    ///
    /// 事务内读取工作流、批次及批次在目标容器的未离池分配, 交由 `apply` 生成动作;
    /// `apply` 返回的新分配与动作一并写入, 工作流汇总随之更新
    pub fn append_action<E, F>(
        &self,
        workflow_id: &str,
        container_id: &str,
        apply: F,
    ) -> Result<(CreationAction, BatchCreationWorkflow), E>
    where
        E: From<RepositoryError>,
        F: FnOnce(
            &mut BatchCreationWorkflow,
            &Batch,
            Option<ContainerAssignment>,
        ) -> Result<(CreationAction, Option<ContainerAssignment>), E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let mut workflow = require_workflow_in(&tx, workflow_id)?;
        let batch = require_batch_in(&tx, &workflow.batch_id)?;
        let existing = find_open_assignment_in(&tx, &batch.batch_id, container_id)?;

        let (action, new_assignment) = apply(&mut workflow, &batch, existing)?;
        if let Some(assignment) = &new_assignment {
            insert_assignment_in(&tx, assignment)?;
        }
        insert_action_in(&tx, &action)?;
        update_workflow_in(&tx, &workflow)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok((action, workflow))
    }

    /// 工作流与批次读取-修改-写回 (计划、取消; 单写事务)
    pub fn modify_workflow<T, E, F>(&self, workflow_id: &str, apply: F) -> Result<(T, BatchCreationWorkflow), E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut BatchCreationWorkflow, &mut Batch) -> Result<T, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let mut workflow = require_workflow_in(&tx, workflow_id)?;
        let mut batch = require_batch_in(&tx, &workflow.batch_id)?;

        let result = apply(&mut workflow, &mut batch)?;
        update_workflow_in(&tx, &workflow)?;
        update_batch_in(&tx, &batch)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok((result, workflow))
    }

    /// 动作执行 (单写事务, 全程持有连接锁)
    ///
    /// 动作、工作流、目标分配、批次在事务内读取, `apply` 修改后统一写回;
    /// 动作仅在仍为 PENDING 时可写回, 否则整体回滚
    pub fn execute_action<T, E, F>(&self, action_id: &str, apply: F) -> Result<(T, ActionExecution), E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&Connection, &mut ActionExecution) -> Result<T, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;
        let action = find_action_in(&tx, action_id)?
            .ok_or_else(|| RepositoryError::not_found("CreationAction", action_id))?;
        let workflow = require_workflow_in(&tx, &action.workflow_id)?;
        let assignment = find_assignment_in(&tx, &action.dest_assignment_id)?
            .ok_or_else(|| RepositoryError::not_found("ContainerAssignment", &action.dest_assignment_id))?;
        let batch = require_batch_in(&tx, &workflow.batch_id)?;
        let mut execution = ActionExecution {
            action,
            workflow,
            assignment,
            batch,
        };

        let result = apply(&tx, &mut execution)?;
        complete_action_in(&tx, &execution.action)?;
        update_assignment_in(&tx, &execution.assignment)?;
        update_workflow_in(&tx, &execution.workflow)?;
        update_batch_in(&tx, &execution.batch)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok((result, execution))
    }
}

/// 动作执行的事务内上下文
#[derive(Debug, Clone)]
pub struct ActionExecution {
    pub action: CreationAction,
    pub workflow: BatchCreationWorkflow,
    pub assignment: ContainerAssignment,
    pub batch: Batch,
}

fn find_workflow_in(conn: &Connection, workflow_id: &str) -> RepositoryResult<Option<BatchCreationWorkflow>> {
    let workflow = conn
        .query_row(
            &format!(
                "SELECT {} FROM batch_creation_workflow WHERE workflow_id = ?",
                WORKFLOW_COLUMNS
            ),
            params![workflow_id],
            map_workflow_row,
        )
        .optional()?;
    Ok(workflow)
}

fn require_workflow_in(conn: &Connection, workflow_id: &str) -> RepositoryResult<BatchCreationWorkflow> {
    find_workflow_in(conn, workflow_id)?.ok_or_else(|| RepositoryError::not_found("BatchCreationWorkflow", workflow_id))
}

fn require_batch_in(conn: &Connection, batch_id: &str) -> RepositoryResult<Batch> {
    find_batch_in(conn, batch_id)?.ok_or_else(|| RepositoryError::not_found("Batch", batch_id))
}

fn find_action_in(conn: &Connection, action_id: &str) -> RepositoryResult<Option<CreationAction>> {
    let action = conn
        .query_row(
            &format!("SELECT {} FROM creation_action WHERE action_id = ?", ACTION_COLUMNS),
            params![action_id],
            map_action_row,
        )
        .optional()?;
    Ok(action)
}

fn update_workflow_in(conn: &Connection, w: &BatchCreationWorkflow) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"UPDATE batch_creation_workflow SET
               status = ?, total_eggs_planned = ?, total_eggs_received = ?,
               total_mortality_on_arrival = ?, total_actions = ?, actions_completed = ?,
               progress_percentage = ?, planned_start_date = ?, planned_completion_date = ?,
               actual_start_date = ?, actual_completion_date = ?, cancelled_at = ?,
               cancelled_by = ?, cancellation_reason = ?, updated_at = ?, notes = ?
           WHERE workflow_id = ?"#,
        params![
            w.status.to_db_str(),
            w.total_eggs_planned,
            w.total_eggs_received,
            w.total_mortality_on_arrival,
            w.total_actions,
            w.actions_completed,
            w.progress_percentage,
            fmt_opt_date(w.planned_start_date),
            fmt_opt_date(w.planned_completion_date),
            fmt_opt_date(w.actual_start_date),
            fmt_opt_date(w.actual_completion_date),
            fmt_opt_datetime(w.cancelled_at),
            &w.cancelled_by,
            &w.cancellation_reason,
            fmt_datetime(w.updated_at),
            &w.notes,
            &w.workflow_id,
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::not_found("BatchCreationWorkflow", &w.workflow_id));
    }
    Ok(())
}

fn insert_action_in(conn: &Connection, a: &CreationAction) -> RepositoryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO creation_action ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ACTION_COLUMNS
        ),
        params![
            &a.action_id,
            &a.workflow_id,
            a.action_number,
            a.status.to_db_str(),
            &a.dest_assignment_id,
            a.egg_count_planned,
            fmt_date(a.expected_delivery_date),
            fmt_opt_date(a.actual_delivery_date),
            a.mortality_on_arrival,
            a.delivery_method.map(|m| m.to_db_str()),
            a.water_temp_on_arrival,
            &a.executed_by,
            fmt_opt_datetime(a.executed_at),
            &a.notes,
        ],
    )?;
    Ok(())
}

/// 写回执行结果; 仅 PENDING 动作命中, 已执行或已取消的动作返回业务规则违反
fn complete_action_in(conn: &Connection, a: &CreationAction) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"UPDATE creation_action SET
               status = ?, actual_delivery_date = ?, mortality_on_arrival = ?,
               delivery_method = ?, water_temp_on_arrival = ?, executed_by = ?,
               executed_at = ?, notes = ?
           WHERE action_id = ? AND status = ?"#,
        params![
            a.status.to_db_str(),
            fmt_opt_date(a.actual_delivery_date),
            a.mortality_on_arrival,
            a.delivery_method.map(|m| m.to_db_str()),
            a.water_temp_on_arrival,
            &a.executed_by,
            fmt_opt_datetime(a.executed_at),
            &a.notes,
            &a.action_id,
            ActionStatus::Pending.to_db_str(),
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "动作 {} 不是 PENDING 状态, 不能重复执行",
            a.action_id
        )));
    }
    Ok(())
}

fn map_workflow_row(row: &rusqlite::Row) -> rusqlite::Result<BatchCreationWorkflow> {
    Ok(BatchCreationWorkflow {
        workflow_id: row.get(0)?,
        workflow_number: row.get(1)?,
        batch_id: row.get(2)?,
        status: WorkflowStatus::from_str(&row.get::<_, String>(3)?),
        egg_source_type: EggSourceType::from_str(&row.get::<_, String>(4)?),
        egg_production_id: row.get(5)?,
        external_supplier_id: row.get(6)?,
        external_supplier_batch_number: row.get(7)?,
        total_eggs_planned: row.get(8)?,
        total_eggs_received: row.get(9)?,
        total_mortality_on_arrival: row.get(10)?,
        total_actions: row.get(11)?,
        actions_completed: row.get(12)?,
        progress_percentage: row.get(13)?,
        planned_start_date: get_opt_date(row, 14)?,
        planned_completion_date: get_opt_date(row, 15)?,
        actual_start_date: get_opt_date(row, 16)?,
        actual_completion_date: get_opt_date(row, 17)?,
        cancelled_at: get_opt_datetime(row, 18)?,
        cancelled_by: row.get(19)?,
        cancellation_reason: row.get(20)?,
        created_by: row.get(21)?,
        created_at: get_datetime(row, 22)?,
        updated_at: get_datetime(row, 23)?,
        notes: row.get(24)?,
    })
}

fn map_action_row(row: &rusqlite::Row) -> rusqlite::Result<CreationAction> {
    Ok(CreationAction {
        action_id: row.get(0)?,
        workflow_id: row.get(1)?,
        action_number: row.get(2)?,
        status: ActionStatus::from_str(&row.get::<_, String>(3)?),
        dest_assignment_id: row.get(4)?,
        egg_count_planned: row.get(5)?,
        expected_delivery_date: get_date(row, 6)?,
        actual_delivery_date: get_opt_date(row, 7)?,
        mortality_on_arrival: row.get(8)?,
        delivery_method: row
            .get::<_, Option<String>>(9)?
            .map(|s| DeliveryMethod::from_str(&s)),
        water_temp_on_arrival: row.get(10)?,
        executed_by: row.get(11)?,
        executed_at: get_opt_datetime(row, 12)?,
        notes: row.get(13)?,
    })
}
