// ==========================================
// 养殖批次运营核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod batch_repo;
pub mod container_repo;
pub mod error;
pub mod feeding_repo;
pub mod growth_repo;
pub mod mortality_repo;
mod row_utils;
pub mod scenario_repo;
pub mod workflow_repo;

// 重导出核心仓储
pub use batch_repo::{AssignmentRepository, BatchRepository, SpeciesRepository};
pub use container_repo::ContainerRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use feeding_repo::FeedingRepository;
pub use growth_repo::GrowthSampleRepository;
pub use mortality_repo::MortalityRepository;
pub use scenario_repo::ScenarioRepository;
pub use workflow_repo::{ActionExecution, WorkflowRepository};
