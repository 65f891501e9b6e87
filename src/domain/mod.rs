// ==========================================
// 养殖批次运营核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod feeding;
pub mod growth;
pub mod mortality;
pub mod scenario;
pub mod types;
pub mod workflow;

// 重导出核心类型
pub use batch::{Batch, Container, ContainerAssignment, LifecycleStage, Species};
pub use feeding::{Feed, FeedStock, FeedingEvent};
pub use growth::GrowthSample;
pub use mortality::MortalityEvent;
pub use scenario::{Scenario, ScenarioProjection};
pub use types::{
    ActionStatus, AggregationLevel, BatchStatus, BatchType, ConfidenceLevel, DeliveryMethod,
    EggSourceType, MortalityCause, TimeInterval, WorkflowStatus,
};
pub use workflow::{validate_egg_source, BatchCreationWorkflow, CreationAction};
