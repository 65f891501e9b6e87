// ==========================================
// 养殖批次运营核心 - API 层
// ==========================================
// 职责: 用例入口: 校验 → 经仓储加载 → 引擎计算 → 原子落库
// ==========================================

pub mod batch_api;
pub mod config_api;
pub mod dashboard_api;
pub mod error;
pub mod fcr_api;
pub mod feeding_api;
pub mod import_api;
pub mod validator;
pub mod workflow_api;

// 重导出核心类型
pub use batch_api::{
    BatchApi, CreateAssignmentRequest, CreateBatchRequest, RecordGrowthSampleRequest, RecordMortalityRequest,
};
pub use config_api::ConfigApi;
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult, FieldViolation};
pub use fcr_api::{FcrApi, ProjectionInput, SaveScenarioRequest};
pub use feeding_api::{FeedingApi, FeedingRecord, RecordFeedingRequest};
pub use import_api::ImportApi;
pub use validator::CapacityValidator;
pub use workflow_api::{AddActionRequest, CreateWorkflowRequest, ExecuteActionRequest, WorkflowApi};
