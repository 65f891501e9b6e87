// ==========================================
// 养殖批次运营核心 - 批次创建工作流 API
// ==========================================
// 职责: 工作流创建/追加动作/计划/执行/取消
// 约束: 每次变更的读取与落库在同一 SQLite 写事务内完成 (动作 + 工作流 + 分配 + 批次)
// ==========================================

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::api::validator::CapacityValidator;
use crate::config::ConfigManager;
use crate::domain::batch::ContainerAssignment;
use crate::domain::types::{BatchStatus, DeliveryMethod, EggSourceType, WorkflowStatus};
use crate::domain::workflow::{validate_egg_source, BatchCreationWorkflow, CreationAction};
use crate::engine::workflow::{ExecutionOutcome, NewCreationAction, WorkflowEngine};
use crate::perf::OpTimer;
use crate::repository::{BatchRepository, ContainerRepository, WorkflowRepository};

// ==========================================
// 请求结构
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowRequest {
    pub batch_id: String,
    pub egg_source_type: EggSourceType,
    pub egg_production_id: Option<String>,
    pub external_supplier_id: Option<String>,
    pub external_supplier_batch_number: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_completion_date: Option<NaiveDate>,
    pub created_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddActionRequest {
    pub workflow_id: String,
    /// 目标容器; 复用批次在该容器未离池的分配, 没有则新建
    pub container_id: String,
    pub egg_count_planned: i64,
    pub expected_delivery_date: NaiveDate,
    pub delivery_method: Option<DeliveryMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActionRequest {
    pub action_id: String,
    pub mortality_on_arrival: i64,
    pub water_temp_on_arrival: Option<f64>,
    pub executed_by: String,
}

// ==========================================
// WorkflowApi - 批次创建工作流 API
// ==========================================

/// 批次创建工作流API
///
/// 职责：
/// 1. 鱼卵来源校验与工作流编号生成
/// 2. 动作编排（追加、计划）
/// 3. 动作执行（分配累加、批次状态推进）
/// 4. 取消（仅限尚无动作执行）
pub struct WorkflowApi {
    workflow_repo: Arc<WorkflowRepository>,
    batch_repo: Arc<BatchRepository>,
    container_repo: Arc<ContainerRepository>,
    capacity_validator: Arc<CapacityValidator>,
    config: Arc<ConfigManager>,
    engine: WorkflowEngine,
}

impl WorkflowApi {
    /// 创建新的WorkflowApi实例
    ///
    /// # 参数
    /// - workflow_repo: 工作流/动作仓储
    /// - batch_repo: 批次仓储
    /// - container_repo: 容器仓储
    /// - capacity_validator: 容器容量校验器
    /// - config: 配置管理器 (工作流编号前缀)
    pub fn new(
        workflow_repo: Arc<WorkflowRepository>,
        batch_repo: Arc<BatchRepository>,
        container_repo: Arc<ContainerRepository>,
        capacity_validator: Arc<CapacityValidator>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            workflow_repo,
            batch_repo,
            container_repo,
            capacity_validator,
            config,
            engine: WorkflowEngine::new(),
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 为 PLANNED 批次创建工作流 (状态 DRAFT)
    #[instrument(skip(self, req), fields(batch_id = %req.batch_id))]
    pub fn create_workflow(&self, req: CreateWorkflowRequest) -> ApiResult<BatchCreationWorkflow> {
        let _timer = OpTimer::start("create_workflow");
        let batch = self
            .batch_repo
            .find_by_id(&req.batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Batch(id={})不存在", req.batch_id)))?;

        let mut violations: Vec<FieldViolation> = validate_egg_source(
            req.egg_source_type,
            req.egg_production_id.as_deref(),
            req.external_supplier_id.as_deref(),
            req.external_supplier_batch_number.as_deref(),
        )
        .into_iter()
        .map(|(field, message)| FieldViolation::new(field, message))
        .collect();
        if req.created_by.trim().is_empty() {
            violations.push(FieldViolation::new("created_by", "不能为空"));
        }
        if let (Some(start), Some(end)) = (req.planned_start_date, req.planned_completion_date) {
            if end < start {
                violations.push(FieldViolation::new("planned_completion_date", "不能早于计划开始日期"));
            }
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        if batch.status != BatchStatus::Planned {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 状态为 {}, 仅 PLANNED 批次可创建工作流",
                batch.batch_number, batch.status
            )));
        }
        let open = self
            .workflow_repo
            .find_by_batch(&batch.batch_id)?
            .into_iter()
            .any(|w| !w.status.is_terminal());
        if open {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 已存在未结束的创建工作流",
                batch.batch_number
            )));
        }

        let now = chrono::Local::now().naive_local();
        let prefix = self.config.get_workflow_number_prefix()?;
        let workflow_number = self.workflow_repo.next_workflow_number(&prefix, now.year())?;

        let workflow = BatchCreationWorkflow {
            workflow_id: Uuid::new_v4().to_string(),
            workflow_number,
            batch_id: batch.batch_id,
            status: WorkflowStatus::Draft,
            egg_source_type: req.egg_source_type,
            egg_production_id: req.egg_production_id,
            external_supplier_id: req.external_supplier_id,
            external_supplier_batch_number: req.external_supplier_batch_number,
            total_eggs_planned: 0,
            total_eggs_received: 0,
            total_mortality_on_arrival: 0,
            total_actions: 0,
            actions_completed: 0,
            progress_percentage: 0.0,
            planned_start_date: req.planned_start_date,
            planned_completion_date: req.planned_completion_date,
            actual_start_date: None,
            actual_completion_date: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            created_by: req.created_by,
            created_at: now,
            updated_at: now,
            notes: req.notes,
        };
        self.workflow_repo.insert(&workflow)?;
        info!(
            workflow_id = %workflow.workflow_id,
            workflow_number = %workflow.workflow_number,
            "创建工作流已建立"
        );
        Ok(workflow)
    }

    // ==========================================
    // 编排
    // ==========================================

    /// 追加动作 (DRAFT / PLANNED)
    ///
    /// 批次在目标容器已有未离池分配时复用, 否则新建空分配
    #[instrument(skip(self, req), fields(workflow_id = %req.workflow_id, container_id = %req.container_id))]
    pub fn add_action(&self, req: AddActionRequest) -> ApiResult<CreationAction> {
        let _timer = OpTimer::start("add_action");
        self.container_repo
            .find_by_id(&req.container_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Container(id={})不存在", req.container_id)))?;

        let now = chrono::Local::now().naive_local();
        let AddActionRequest {
            workflow_id,
            container_id,
            egg_count_planned,
            expected_delivery_date,
            delivery_method,
            notes,
        } = req;
        let (action, workflow) = self.workflow_repo.append_action(
            &workflow_id,
            &container_id,
            |workflow, batch, existing| -> ApiResult<(CreationAction, Option<ContainerAssignment>)> {
                let (dest_assignment_id, new_assignment) = match existing {
                    Some(a) => (a.assignment_id, None),
                    None => {
                        let a = ContainerAssignment {
                            assignment_id: Uuid::new_v4().to_string(),
                            batch_id: batch.batch_id.clone(),
                            container_id: container_id.clone(),
                            lifecycle_stage_id: batch.lifecycle_stage_id.clone(),
                            population_count: 0,
                            avg_weight_g: 0.0,
                            biomass_kg: 0.0,
                            assignment_date: expected_delivery_date,
                            departure_date: None,
                            is_active: false,
                            notes: None,
                        };
                        (a.assignment_id.clone(), Some(a))
                    }
                };
                let action = self.engine.add_action(
                    workflow,
                    Uuid::new_v4().to_string(),
                    NewCreationAction {
                        dest_assignment_id,
                        egg_count_planned,
                        expected_delivery_date,
                        delivery_method,
                        notes,
                    },
                    now,
                )?;
                Ok((action, new_assignment))
            },
        )?;

        info!(
            action_id = %action.action_id,
            action_number = action.action_number,
            total_eggs_planned = workflow.total_eggs_planned,
            "动作已追加"
        );
        Ok(action)
    }

    /// 进入计划 (DRAFT 且至少 1 个动作)
    #[instrument(skip(self))]
    pub fn plan_workflow(&self, workflow_id: &str) -> ApiResult<BatchCreationWorkflow> {
        let now = chrono::Local::now().naive_local();
        let ((), workflow) = self
            .workflow_repo
            .modify_workflow(workflow_id, |workflow, _batch| -> ApiResult<()> {
                self.engine.plan(workflow, now)?;
                Ok(())
            })?;
        info!(workflow_id = %workflow.workflow_id, "工作流已计划");
        Ok(workflow)
    }

    // ==========================================
    // 执行
    // ==========================================

    /// 执行动作
    ///
    /// 读取、状态推进、容量校验与落库在同一写事务内完成;
    /// 同一动作并发或重复执行时仅一次生效
    #[instrument(skip(self, req), fields(action_id = %req.action_id))]
    pub fn execute_action(&self, req: ExecuteActionRequest) -> ApiResult<ExecutionOutcome> {
        let _timer = OpTimer::start("execute_action");
        if req.executed_by.trim().is_empty() {
            return Err(ApiError::invalid_field("executed_by", "不能为空"));
        }

        let capacity_enabled = self.capacity_validator.is_enabled()?;
        let now = chrono::Local::now().naive_local();
        let (outcome, execution) = self.workflow_repo.execute_action(
            &req.action_id,
            |conn, ctx| -> ApiResult<ExecutionOutcome> {
                let outcome = self.engine.execute_action(
                    &mut ctx.workflow,
                    &mut ctx.action,
                    &mut ctx.assignment,
                    &mut ctx.batch,
                    req.mortality_on_arrival,
                    req.water_temp_on_arrival,
                    req.executed_by.trim(),
                    now,
                )?;
                CapacityValidator::validate_assignment_in(conn, &ctx.assignment, capacity_enabled)?;
                Ok(outcome)
            },
        )?;

        info!(
            workflow_id = %execution.workflow.workflow_id,
            eggs_received = outcome.eggs_received,
            mortality_on_arrival = outcome.mortality_on_arrival,
            progress = outcome.progress_percentage,
            workflow_status = %outcome.workflow_status,
            "动作已执行"
        );
        if outcome.workflow_completed {
            info!(batch_id = %execution.batch.batch_id, "工作流完成, 批次转为 ACTIVE");
        }
        Ok(outcome)
    }

    // ==========================================
    // 取消
    // ==========================================

    #[instrument(skip(self, reason))]
    pub fn cancel_workflow(&self, workflow_id: &str, reason: &str, cancelled_by: &str) -> ApiResult<BatchCreationWorkflow> {
        if reason.trim().is_empty() {
            return Err(ApiError::invalid_field("cancellation_reason", "不能为空"));
        }
        let now = chrono::Local::now().naive_local();
        let ((), workflow) = self
            .workflow_repo
            .modify_workflow(workflow_id, |workflow, batch| -> ApiResult<()> {
                if let Err(e) = self.engine.cancel(workflow, batch, reason.trim(), cancelled_by, now) {
                    warn!(workflow_id = %workflow_id, error = %e, "工作流取消被拒绝");
                    return Err(e.into());
                }
                Ok(())
            })?;
        info!(workflow_id = %workflow_id, "工作流已取消");
        Ok(workflow)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_workflow(&self, workflow_id: &str) -> ApiResult<BatchCreationWorkflow> {
        self.require_workflow(workflow_id)
    }

    pub fn list_actions(&self, workflow_id: &str) -> ApiResult<Vec<CreationAction>> {
        self.require_workflow(workflow_id)?;
        Ok(self.workflow_repo.list_actions(workflow_id)?)
    }

    fn require_workflow(&self, workflow_id: &str) -> ApiResult<BatchCreationWorkflow> {
        self.workflow_repo
            .find_by_id(workflow_id)?
            .ok_or_else(|| ApiError::NotFound(format!("BatchCreationWorkflow(id={})不存在", workflow_id)))
    }
}
