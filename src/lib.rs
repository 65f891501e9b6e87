// ==========================================
// 养殖批次运营核心 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批次生长/死亡/饲料转化分析 + 批次创建工作流
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务计算与状态机
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// SQL 追踪与操作耗时
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ActionStatus, AggregationLevel, BatchStatus, BatchType, ConfidenceLevel, DeliveryMethod, EggSourceType,
    MortalityCause, TimeInterval, WorkflowStatus,
};

// 领域实体
pub use domain::{
    Batch, BatchCreationWorkflow, Container, ContainerAssignment, CreationAction, Feed, FeedStock, FeedingEvent,
    GrowthSample, LifecycleStage, MortalityEvent, Scenario, ScenarioProjection, Species,
};

// 引擎
pub use engine::{FcrTrendsEngine, FeedingEngine, GeographyKpiEngine, GrowthAnalyticsEngine, MortalityAggregator, WorkflowEngine};

// API
pub use api::{ApiError, ApiResult, BatchApi, DashboardApi, FcrApi, FeedingApi, WorkflowApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "养殖批次运营核心";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(DB_VERSION, "v0.1");
    }
}
