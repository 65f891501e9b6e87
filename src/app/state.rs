// ==========================================
// 养殖批次运营核心 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约束: 所有仓储共享同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    BatchApi, CapacityValidator, ConfigApi, DashboardApi, FcrApi, FeedingApi, ImportApi, WorkflowApi,
};
use crate::config::ConfigManager;
use crate::db;
use crate::repository::{
    AssignmentRepository, BatchRepository, ContainerRepository, FeedingRepository, GrowthSampleRepository,
    MortalityRepository, ScenarioRepository, SpeciesRepository, WorkflowRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接 (测试/种子数据直接使用)
    pub conn: Arc<Mutex<Connection>>,

    /// 批次/分配/抽样/死亡API
    pub batch_api: Arc<BatchApi>,

    /// 批次创建工作流API
    pub workflow_api: Arc<WorkflowApi>,

    /// 投喂API
    pub feeding_api: Arc<FeedingApi>,

    /// FCR 趋势API
    pub fcr_api: Arc<FcrApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 抽样导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径 (不存在时自动建库)
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_shared_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let species_repo = Arc::new(SpeciesRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let container_repo = Arc::new(ContainerRepository::new(conn.clone()));
        let sample_repo = Arc::new(GrowthSampleRepository::new(conn.clone()));
        let mortality_repo = Arc::new(MortalityRepository::new(conn.clone()));
        let feeding_repo = Arc::new(FeedingRepository::new(conn.clone()));
        let scenario_repo = Arc::new(ScenarioRepository::new(conn.clone()));
        let workflow_repo = Arc::new(WorkflowRepository::new(conn.clone()));

        let config_manager = Arc::new(ConfigManager::new(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let capacity_validator = Arc::new(CapacityValidator::new(
            container_repo.clone(),
            assignment_repo.clone(),
            config_manager.clone(),
        ));

        let batch_api = Arc::new(BatchApi::new(
            species_repo,
            batch_repo.clone(),
            assignment_repo.clone(),
            container_repo.clone(),
            sample_repo.clone(),
            mortality_repo.clone(),
            capacity_validator.clone(),
        ));

        let workflow_api = Arc::new(WorkflowApi::new(
            workflow_repo,
            batch_repo.clone(),
            container_repo.clone(),
            capacity_validator,
            config_manager.clone(),
        ));

        let feeding_api = Arc::new(FeedingApi::new(feeding_repo.clone(), assignment_repo.clone()));

        let fcr_api = Arc::new(FcrApi::new(
            feeding_repo.clone(),
            assignment_repo.clone(),
            container_repo.clone(),
            sample_repo.clone(),
            scenario_repo,
            batch_repo,
            config_manager.clone(),
        ));

        let dashboard_api = Arc::new(DashboardApi::new(
            container_repo,
            assignment_repo.clone(),
            mortality_repo,
            feeding_repo,
            sample_repo.clone(),
        ));

        let config_api = Arc::new(ConfigApi::new(config_manager.clone()));
        let import_api = Arc::new(ImportApi::new(sample_repo, assignment_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn,
            batch_api,
            workflow_api,
            feeding_api,
            fcr_api,
            dashboard_api,
            config_api,
            import_api,
            config_manager,
        })
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - AQUAFARM_DB_PATH 环境变量 (非空时)
/// - 开发环境: 用户数据目录/aquafarm-dev/aquafarm.db
/// - 生产环境: 用户数据目录/aquafarm/aquafarm.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("AQUAFARM_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./aquafarm.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("aquafarm-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("aquafarm");
        }

        // 目录创建失败时回落到相对路径
        if std::fs::create_dir_all(&path).is_ok() {
            path = path.join("aquafarm.db");
        } else {
            path = PathBuf::from("./aquafarm.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.config_api.get_config_snapshot().unwrap().starts_with('{'));
    }
}
