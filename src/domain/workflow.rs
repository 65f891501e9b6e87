// ==========================================
// 养殖批次运营核心 - 批次创建工作流领域模型
// ==========================================
// 职责: 鱼卵交付工作流 + 创建动作
// 流转: DRAFT → PLANNED → IN_PROGRESS → COMPLETED
//       DRAFT/PLANNED → CANCELLED (仅限尚无动作执行)
// ==========================================

use crate::domain::types::{ActionStatus, DeliveryMethod, EggSourceType, WorkflowStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// BatchCreationWorkflow - 批次创建工作流
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreationWorkflow {
    pub workflow_id: String,
    pub workflow_number: String, // 例: CRT-2026-001
    pub batch_id: String,
    pub status: WorkflowStatus,

    // ===== 鱼卵来源 =====
    pub egg_source_type: EggSourceType,
    pub egg_production_id: Option<String>,              // INTERNAL
    pub external_supplier_id: Option<String>,           // EXTERNAL
    pub external_supplier_batch_number: Option<String>, // EXTERNAL

    // ===== 汇总 =====
    pub total_eggs_planned: i64,
    pub total_eggs_received: i64,
    pub total_mortality_on_arrival: i64,
    pub total_actions: i32,
    pub actions_completed: i32,
    pub progress_percentage: f64,

    // ===== 时间 =====
    pub planned_start_date: Option<NaiveDate>,
    pub planned_completion_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_completion_date: Option<NaiveDate>,

    // ===== 取消信息 =====
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,

    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub notes: Option<String>,
}

impl BatchCreationWorkflow {
    /// 是否允许追加动作 (仅 DRAFT / PLANNED)
    pub fn can_add_actions(&self) -> bool {
        matches!(self.status, WorkflowStatus::Draft | WorkflowStatus::Planned)
    }

    /// 是否允许进入计划 (DRAFT 且至少 1 个动作)
    pub fn can_plan(&self) -> bool {
        self.status == WorkflowStatus::Draft && self.total_actions > 0
    }

    /// 是否允许取消 (尚无动作执行)
    pub fn can_cancel(&self) -> bool {
        !self.status.is_terminal() && self.actions_completed == 0
    }

    /// 是否全部动作已执行
    pub fn all_actions_completed(&self) -> bool {
        self.total_actions > 0 && self.actions_completed >= self.total_actions
    }

    /// 重新计算进度百分比
    pub fn refresh_progress(&mut self) {
        self.progress_percentage = if self.total_actions > 0 {
            crate::domain::batch::round_to(
                self.actions_completed as f64 / self.total_actions as f64 * 100.0,
                2,
            )
        } else {
            0.0
        };
    }
}

// ==========================================
// 鱼卵来源组合校验
// ==========================================

/// 鱼卵来源字段组合违规 (字段名, 原因)
pub type EggSourceViolation = (String, String);

/// 校验鱼卵来源组合
///
/// - INTERNAL: 必须有 egg_production_id, 不得带供应商字段
/// - EXTERNAL: 必须有 external_supplier_id, 不得带 egg_production_id
pub fn validate_egg_source(
    egg_source_type: EggSourceType,
    egg_production_id: Option<&str>,
    external_supplier_id: Option<&str>,
    external_supplier_batch_number: Option<&str>,
) -> Vec<EggSourceViolation> {
    let present = |v: Option<&str>| v.map(|s| !s.trim().is_empty()).unwrap_or(false);
    let mut violations = Vec::new();

    match egg_source_type {
        EggSourceType::Internal => {
            if !present(egg_production_id) {
                violations.push((
                    "egg_production_id".to_string(),
                    "内部来源必须指定产卵记录".to_string(),
                ));
            }
            if present(external_supplier_id) || present(external_supplier_batch_number) {
                violations.push((
                    "external_supplier_id".to_string(),
                    "内部来源不得指定外部供应商".to_string(),
                ));
            }
        }
        EggSourceType::External => {
            if !present(external_supplier_id) {
                violations.push((
                    "external_supplier_id".to_string(),
                    "外部来源必须指定供应商".to_string(),
                ));
            }
            if present(egg_production_id) {
                violations.push((
                    "egg_production_id".to_string(),
                    "外部来源不得关联内部产卵记录".to_string(),
                ));
            }
        }
    }

    violations
}

// ==========================================
// CreationAction - 创建动作 (单次鱼卵入池)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationAction {
    pub action_id: String,
    pub workflow_id: String,
    pub action_number: i32,
    pub status: ActionStatus,
    pub dest_assignment_id: String,
    pub egg_count_planned: i64,
    pub expected_delivery_date: NaiveDate,
    pub actual_delivery_date: Option<NaiveDate>,
    pub mortality_on_arrival: Option<i64>,
    pub delivery_method: Option<DeliveryMethod>,
    pub water_temp_on_arrival: Option<f64>,
    pub executed_by: Option<String>,
    pub executed_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

impl CreationAction {
    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    /// 实际入池数量 (计划数 - 到货死亡)
    pub fn eggs_received(&self) -> i64 {
        self.egg_count_planned - self.mortality_on_arrival.unwrap_or(0)
    }
}
