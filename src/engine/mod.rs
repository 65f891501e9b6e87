// ==========================================
// 养殖批次运营核心 - 引擎层
// ==========================================
// 职责: 实现业务计算与状态流转,不拼 SQL
// 红线: Engine 不拼 SQL, 只处理调用方传入的集合
// ==========================================

pub mod fcr_trends;
pub mod feeding;
pub mod geography;
pub mod growth;
pub mod mortality;
pub mod workflow;

// 重导出核心引擎
pub use fcr_trends::{
    ConfidenceThresholds, FcrQueryDefaults, FcrSeries, FcrTrendPoint, FcrTrends, FcrTrendsEngine,
    FcrTrendsQuery, ResolvedFcrQuery,
};
pub use feeding::{FeedingEngine, FeedingError, FeedingOutcome};
pub use geography::{GeographyKpiEngine, GeographySummary};
pub use growth::{GrowthAnalysis, GrowthAnalyticsEngine, GrowthSummary};
pub use mortality::{MortalityAggregator, MortalitySummary};
pub use workflow::{ExecutionOutcome, NewCreationAction, WorkflowEngine, WorkflowError};
