// ==========================================
// 养殖批次运营核心 - 批次创建工作流引擎 (状态机)
// ==========================================
// 职责: 工作流状态流转 + 动作执行的内存变更
// 流转: DRAFT → PLANNED → IN_PROGRESS → COMPLETED
//       DRAFT/PLANNED → CANCELLED
// 红线: 引擎只改内存对象, 持久化与事务由调用方负责
// ==========================================

use crate::domain::batch::{Batch, ContainerAssignment};
use crate::domain::types::{ActionStatus, BatchStatus, DeliveryMethod, WorkflowStatus};
use crate::domain::workflow::{BatchCreationWorkflow, CreationAction};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 工作流状态机错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("无效的状态转换: 工作流状态={from}, 操作={operation}")]
    InvalidTransition { from: String, operation: String },

    #[error("动作不是待执行状态: action_id={action_id}, status={status}")]
    ActionNotPending { action_id: String, status: String },

    #[error("动作不属于该工作流: action_id={action_id}, workflow_id={workflow_id}")]
    ActionWorkflowMismatch { action_id: String, workflow_id: String },

    #[error("目标分配不匹配: 期望={expected}, 实际={actual}")]
    AssignmentMismatch { expected: String, actual: String },

    #[error("计划鱼卵数必须大于 0: {0}")]
    InvalidEggCount(i64),

    #[error("到货死亡数无效: mortality={mortality}, planned={planned}")]
    InvalidMortality { mortality: i64, planned: i64 },

    #[error("已有动作执行, 不允许取消: workflow_id={0}")]
    CancelAfterExecution(String),
}

/// 新增动作参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCreationAction {
    pub dest_assignment_id: String,
    pub egg_count_planned: i64,
    pub expected_delivery_date: NaiveDate,
    pub delivery_method: Option<DeliveryMethod>,
    pub notes: Option<String>,
}

/// 动作执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub action_id: String,
    pub eggs_received: i64,
    pub mortality_on_arrival: i64,
    pub workflow_status: WorkflowStatus,
    pub batch_status: BatchStatus,
    pub workflow_started: bool,
    pub workflow_completed: bool,
    pub progress_percentage: f64,
}

// ==========================================
// WorkflowEngine - 批次创建工作流引擎
// ==========================================
pub struct WorkflowEngine {
    // 无状态引擎
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {}
    }

    fn invalid(workflow: &BatchCreationWorkflow, operation: &str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            from: workflow.status.to_string(),
            operation: operation.to_string(),
        }
    }

    /// 追加动作 (仅 DRAFT / PLANNED)
    ///
    /// 动作编号 = 当前动作数 + 1, 同步累计计划鱼卵数
    pub fn add_action(
        &self,
        workflow: &mut BatchCreationWorkflow,
        action_id: String,
        params: NewCreationAction,
        now: NaiveDateTime,
    ) -> Result<CreationAction, WorkflowError> {
        if !workflow.can_add_actions() {
            return Err(Self::invalid(workflow, "ADD_ACTION"));
        }
        if params.egg_count_planned <= 0 {
            return Err(WorkflowError::InvalidEggCount(params.egg_count_planned));
        }

        workflow.total_actions += 1;
        workflow.total_eggs_planned += params.egg_count_planned;
        workflow.refresh_progress();
        workflow.updated_at = now;

        Ok(CreationAction {
            action_id,
            workflow_id: workflow.workflow_id.clone(),
            action_number: workflow.total_actions,
            status: ActionStatus::Pending,
            dest_assignment_id: params.dest_assignment_id,
            egg_count_planned: params.egg_count_planned,
            expected_delivery_date: params.expected_delivery_date,
            actual_delivery_date: None,
            mortality_on_arrival: None,
            delivery_method: params.delivery_method,
            water_temp_on_arrival: None,
            executed_by: None,
            executed_at: None,
            notes: params.notes,
        })
    }

    /// 进入计划 (DRAFT 且至少 1 个动作)
    pub fn plan(&self, workflow: &mut BatchCreationWorkflow, now: NaiveDateTime) -> Result<(), WorkflowError> {
        if !workflow.can_plan() {
            return Err(Self::invalid(workflow, "PLAN"));
        }
        workflow.status = WorkflowStatus::Planned;
        workflow.updated_at = now;
        Ok(())
    }

    /// 执行动作 (鱼卵入池)
    ///
    /// - 分配数量 += 计划数 - 到货死亡, 分配置为活跃
    /// - 首次执行: 工作流 → IN_PROGRESS, 批次 → RECEIVING
    /// - 全部执行: 工作流 → COMPLETED, 批次 → ACTIVE
    #[allow(clippy::too_many_arguments)]
    pub fn execute_action(
        &self,
        workflow: &mut BatchCreationWorkflow,
        action: &mut CreationAction,
        assignment: &mut ContainerAssignment,
        batch: &mut Batch,
        mortality_on_arrival: i64,
        water_temp_on_arrival: Option<f64>,
        executed_by: &str,
        now: NaiveDateTime,
    ) -> Result<ExecutionOutcome, WorkflowError> {
        if action.workflow_id != workflow.workflow_id {
            return Err(WorkflowError::ActionWorkflowMismatch {
                action_id: action.action_id.clone(),
                workflow_id: workflow.workflow_id.clone(),
            });
        }
        if assignment.assignment_id != action.dest_assignment_id {
            return Err(WorkflowError::AssignmentMismatch {
                expected: action.dest_assignment_id.clone(),
                actual: assignment.assignment_id.clone(),
            });
        }
        if workflow.status.is_terminal() {
            return Err(Self::invalid(workflow, "EXECUTE_ACTION"));
        }
        if !action.is_pending() {
            return Err(WorkflowError::ActionNotPending {
                action_id: action.action_id.clone(),
                status: action.status.to_string(),
            });
        }
        if mortality_on_arrival < 0 || mortality_on_arrival > action.egg_count_planned {
            return Err(WorkflowError::InvalidMortality {
                mortality: mortality_on_arrival,
                planned: action.egg_count_planned,
            });
        }

        let today = now.date();

        // 1. 动作
        action.status = ActionStatus::Completed;
        action.mortality_on_arrival = Some(mortality_on_arrival);
        let eggs_received = action.eggs_received();
        action.water_temp_on_arrival = water_temp_on_arrival.or(action.water_temp_on_arrival);
        action.actual_delivery_date = Some(today);
        action.executed_by = Some(executed_by.to_string());
        action.executed_at = Some(now);

        // 2. 目标分配 (多动作可累加到同一分配)
        assignment.add_population(eggs_received);
        assignment.is_active = true;

        // 3. 工作流汇总
        workflow.total_eggs_received += eggs_received;
        workflow.total_mortality_on_arrival += mortality_on_arrival;
        workflow.actions_completed += 1;
        workflow.refresh_progress();
        workflow.updated_at = now;

        let mut workflow_started = false;
        if matches!(workflow.status, WorkflowStatus::Draft | WorkflowStatus::Planned) {
            workflow.status = WorkflowStatus::InProgress;
            workflow.actual_start_date = Some(today);
            batch.status = BatchStatus::Receiving;
            workflow_started = true;
        }

        let mut workflow_completed = false;
        if workflow.all_actions_completed() {
            workflow.status = WorkflowStatus::Completed;
            workflow.actual_completion_date = Some(today);
            batch.status = BatchStatus::Active;
            workflow_completed = true;
        }
        batch.updated_at = now;

        Ok(ExecutionOutcome {
            action_id: action.action_id.clone(),
            eggs_received,
            mortality_on_arrival,
            workflow_status: workflow.status,
            batch_status: batch.status,
            workflow_started,
            workflow_completed,
            progress_percentage: workflow.progress_percentage,
        })
    }

    /// 取消工作流 (尚无动作执行时)
    pub fn cancel(
        &self,
        workflow: &mut BatchCreationWorkflow,
        batch: &mut Batch,
        reason: &str,
        cancelled_by: &str,
        now: NaiveDateTime,
    ) -> Result<(), WorkflowError> {
        if workflow.actions_completed > 0 {
            return Err(WorkflowError::CancelAfterExecution(workflow.workflow_id.clone()));
        }
        if !workflow.can_cancel() {
            return Err(Self::invalid(workflow, "CANCEL"));
        }

        workflow.status = WorkflowStatus::Cancelled;
        workflow.cancelled_at = Some(now);
        workflow.cancelled_by = Some(cancelled_by.to_string());
        workflow.cancellation_reason = Some(reason.to_string());
        workflow.updated_at = now;

        batch.status = BatchStatus::Cancelled;
        batch.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BatchType, EggSourceType};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn workflow() -> BatchCreationWorkflow {
        BatchCreationWorkflow {
            workflow_id: "W1".to_string(),
            workflow_number: "CRT-2026-001".to_string(),
            batch_id: "B1".to_string(),
            status: WorkflowStatus::Draft,
            egg_source_type: EggSourceType::External,
            egg_production_id: None,
            external_supplier_id: Some("SUP1".to_string()),
            external_supplier_batch_number: None,
            total_eggs_planned: 0,
            total_eggs_received: 0,
            total_mortality_on_arrival: 0,
            total_actions: 0,
            actions_completed: 0,
            progress_percentage: 0.0,
            planned_start_date: None,
            planned_completion_date: None,
            actual_start_date: None,
            actual_completion_date: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            created_by: "tester".to_string(),
            created_at: now(),
            updated_at: now(),
            notes: None,
        }
    }

    fn batch() -> Batch {
        Batch {
            batch_id: "B1".to_string(),
            batch_number: "SAL-2026-01".to_string(),
            species_id: "SP1".to_string(),
            lifecycle_stage_id: "EGG".to_string(),
            status: BatchStatus::Planned,
            batch_type: BatchType::Standard,
            start_date: now().date(),
            expected_end_date: None,
            actual_end_date: None,
            notes: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn assignment(id: &str) -> ContainerAssignment {
        ContainerAssignment {
            assignment_id: id.to_string(),
            batch_id: "B1".to_string(),
            container_id: format!("C-{}", id),
            lifecycle_stage_id: "EGG".to_string(),
            population_count: 0,
            avg_weight_g: 0.0,
            biomass_kg: 0.0,
            assignment_date: now().date(),
            departure_date: None,
            is_active: false,
            notes: None,
        }
    }

    fn params(assignment_id: &str, eggs: i64) -> NewCreationAction {
        NewCreationAction {
            dest_assignment_id: assignment_id.to_string(),
            egg_count_planned: eggs,
            expected_delivery_date: now().date(),
            delivery_method: Some(DeliveryMethod::Transport),
            notes: None,
        }
    }

    #[test]
    fn test_plan_requires_actions() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        assert!(!wf.can_plan());
        assert!(engine.plan(&mut wf, now()).is_err());

        engine.add_action(&mut wf, "X1".to_string(), params("A1", 1_000), now()).unwrap();
        engine.plan(&mut wf, now()).unwrap();
        assert_eq!(wf.status, WorkflowStatus::Planned);
        // 计划后仍可追加
        assert!(wf.can_add_actions());
        assert!(!wf.can_plan());
    }

    #[test]
    fn test_two_actions_totals_and_completion() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        let mut b = batch();
        let mut a1 = assignment("A1");
        let mut a2 = assignment("A2");

        let mut x1 = engine.add_action(&mut wf, "X1".to_string(), params("A1", 100_000), now()).unwrap();
        let mut x2 = engine.add_action(&mut wf, "X2".to_string(), params("A2", 150_000), now()).unwrap();
        assert_eq!(x2.action_number, 2);
        assert_eq!(wf.total_eggs_planned, 250_000);

        let out1 = engine
            .execute_action(&mut wf, &mut x1, &mut a1, &mut b, 1_000, Some(8.5), "op", now())
            .unwrap();
        assert!(out1.workflow_started);
        assert!(!out1.workflow_completed);
        assert_eq!(wf.status, WorkflowStatus::InProgress);
        assert_eq!(b.status, BatchStatus::Receiving);
        assert_eq!(wf.progress_percentage, 50.0);
        assert!(!wf.can_add_actions());
        assert!(!wf.can_cancel());

        let out2 = engine
            .execute_action(&mut wf, &mut x2, &mut a2, &mut b, 2_000, None, "op", now())
            .unwrap();
        assert!(out2.workflow_completed);
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert_eq!(b.status, BatchStatus::Active);
        assert_eq!(wf.total_eggs_received, 247_000);
        assert_eq!(wf.total_mortality_on_arrival, 3_000);
        assert_eq!(wf.progress_percentage, 100.0);
        assert_eq!(wf.actual_completion_date, Some(now().date()));
        assert_eq!(a1.population_count, 99_000);
        assert_eq!(a2.population_count, 148_000);
        assert!(a1.is_active && a2.is_active);
    }

    #[test]
    fn test_actions_targeting_same_assignment_accumulate() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        let mut b = batch();
        let mut shared = assignment("A1");

        let mut x1 = engine.add_action(&mut wf, "X1".to_string(), params("A1", 80_000), now()).unwrap();
        let mut x2 = engine.add_action(&mut wf, "X2".to_string(), params("A1", 70_000), now()).unwrap();

        engine.execute_action(&mut wf, &mut x1, &mut shared, &mut b, 800, None, "op", now()).unwrap();
        engine.execute_action(&mut wf, &mut x2, &mut shared, &mut b, 700, None, "op", now()).unwrap();

        assert_eq!(shared.population_count, 148_500);
        assert_eq!(wf.status, WorkflowStatus::Completed);
    }

    #[test]
    fn test_execute_rejects_repeat_and_bad_mortality() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        let mut b = batch();
        let mut a1 = assignment("A1");
        let mut x1 = engine.add_action(&mut wf, "X1".to_string(), params("A1", 500), now()).unwrap();
        engine.add_action(&mut wf, "X2".to_string(), params("A1", 500), now()).unwrap();

        let err = engine
            .execute_action(&mut wf, &mut x1, &mut a1, &mut b, 501, None, "op", now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidMortality { .. }));
        assert_eq!(wf.status, WorkflowStatus::Draft);

        engine.execute_action(&mut wf, &mut x1, &mut a1, &mut b, 0, None, "op", now()).unwrap();
        let err = engine
            .execute_action(&mut wf, &mut x1, &mut a1, &mut b, 0, None, "op", now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ActionNotPending { .. }));
        assert_eq!(a1.population_count, 500);
    }

    #[test]
    fn test_execute_rejects_wrong_assignment() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        let mut b = batch();
        let mut other = assignment("A9");
        let mut x1 = engine.add_action(&mut wf, "X1".to_string(), params("A1", 500), now()).unwrap();
        let err = engine
            .execute_action(&mut wf, &mut x1, &mut other, &mut b, 0, None, "op", now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AssignmentMismatch { .. }));
    }

    #[test]
    fn test_cancel_only_before_execution() {
        let engine = WorkflowEngine::new();

        let mut wf = workflow();
        let mut b = batch();
        engine.add_action(&mut wf, "X1".to_string(), params("A1", 500), now()).unwrap();
        engine.plan(&mut wf, now()).unwrap();
        engine.cancel(&mut wf, &mut b, "供应商延期", "mgr", now()).unwrap();
        assert_eq!(wf.status, WorkflowStatus::Cancelled);
        assert_eq!(b.status, BatchStatus::Cancelled);
        assert_eq!(wf.cancellation_reason.as_deref(), Some("供应商延期"));
        assert_eq!(wf.cancelled_by.as_deref(), Some("mgr"));
        assert!(!wf.can_add_actions());

        let mut wf = workflow();
        let mut b = batch();
        let mut a1 = assignment("A1");
        let mut x1 = engine.add_action(&mut wf, "X1".to_string(), params("A1", 500), now()).unwrap();
        engine.add_action(&mut wf, "X2".to_string(), params("A1", 500), now()).unwrap();
        engine.execute_action(&mut wf, &mut x1, &mut a1, &mut b, 0, None, "op", now()).unwrap();
        let err = engine.cancel(&mut wf, &mut b, "late", "mgr", now()).unwrap_err();
        assert_eq!(err, WorkflowError::CancelAfterExecution("W1".to_string()));
        assert_eq!(wf.status, WorkflowStatus::InProgress);
    }

    #[test]
    fn test_add_action_rejected_after_start() {
        let engine = WorkflowEngine::new();
        let mut wf = workflow();
        wf.status = WorkflowStatus::InProgress;
        let err = engine
            .add_action(&mut wf, "X1".to_string(), params("A1", 500), now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let mut wf = workflow();
        let err = engine
            .add_action(&mut wf, "X1".to_string(), params("A1", 0), now())
            .unwrap_err();
        assert_eq!(err, WorkflowError::InvalidEggCount(0));
    }
}
