// ==========================================
// 养殖批次运营核心 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 约束: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::feeding::FeedingError;
use crate::engine::workflow::WorkflowError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 字段级校验违规
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验 / 业务规则错误
    // ==========================================
    /// 输入校验失败 (带字段明细)
    #[error("数据验证失败: {message}")]
    ValidationError {
        message: String,
        violations: Vec<FieldViolation>,
    },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} operation={operation}")]
    InvalidStateTransition { from: String, operation: String },

    #[error("容器容量超限: container={container_id}, limit={max_biomass_kg}kg, after={resulting_biomass_kg}kg")]
    CapacityExceeded {
        container_id: String,
        max_biomass_kg: f64,
        resulting_biomass_kg: f64,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 单字段校验错误
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationError {
            message: format!("{}: {}", field, message),
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    /// 多字段校验错误; 无违规时返回 None
    pub fn from_violations(violations: Vec<FieldViolation>) -> Option<Self> {
        if violations.is_empty() {
            return None;
        }
        let message = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Some(ApiError::ValidationError { message, violations })
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ApiError::ValidationError { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidTransition { from, operation } => {
                ApiError::InvalidStateTransition { from, operation }
            }
            WorkflowError::CancelAfterExecution(_) => ApiError::InvalidStateTransition {
                from: "IN_PROGRESS".to_string(),
                operation: "CANCEL".to_string(),
            },
            WorkflowError::InvalidEggCount(count) => {
                ApiError::invalid_field("egg_count_planned", format!("鱼卵数必须大于 0: {}", count))
            }
            WorkflowError::InvalidMortality { mortality, planned } => ApiError::invalid_field(
                "mortality_on_arrival",
                format!("到货死亡数 {} 必须在 [0, {}] 范围内", mortality, planned),
            ),
            WorkflowError::ActionNotPending { status, .. } => ApiError::InvalidStateTransition {
                from: status,
                operation: "EXECUTE_ACTION".to_string(),
            },
            other @ (WorkflowError::ActionWorkflowMismatch { .. }
            | WorkflowError::AssignmentMismatch { .. }) => ApiError::BusinessRuleViolation(other.to_string()),
        }
    }
}

// ==========================================
// 从 FeedingError 转换
// ==========================================
impl From<FeedingError> for ApiError {
    fn from(err: FeedingError) -> Self {
        match err {
            FeedingError::InvalidAmount(amount) => {
                ApiError::invalid_field("amount_kg", format!("投喂量必须大于 0: {}", amount))
            }
            other => ApiError::BusinessRuleViolation(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
