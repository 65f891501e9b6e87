// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 + AppState 装配 + 主数据种子
// ==========================================

#![allow(dead_code)]

use aquafarm_core::api::{CreateAssignmentRequest, CreateBatchRequest};
use aquafarm_core::app::AppState;
use aquafarm_core::domain::{Batch, Container, ContainerAssignment};
use aquafarm_core::BatchType;
use chrono::NaiveDate;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();
    Ok((temp_file, db_path))
}

/// 测试环境 (临时库 + 全量 API)
pub struct TestEnv {
    _temp_file: NamedTempFile,
    pub state: AppState,
    pub species_id: String,
    pub stage_egg_id: String,
    pub stage_smolt_id: String,
    /// 地域 GEO-A: 两个容器
    pub tank_a1: Container,
    pub tank_a2: Container,
    /// 地域 GEO-B: 一个容器 (容量 1,000 kg)
    pub pen_b1: Container,
}

impl TestEnv {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let (temp_file, db_path) = create_test_db()?;
        let state = AppState::new(db_path)?;

        let species = state.batch_api.register_species("Atlantic Salmon", Some("Salmo salar"))?;
        let egg = state
            .batch_api
            .register_lifecycle_stage(&species.species_id, "Egg&Alevin", 1)?;
        let smolt = state.batch_api.register_lifecycle_stage(&species.species_id, "Smolt", 4)?;

        let tank_a1 = state.batch_api.register_container(container("T-A1", "GEO-A", 0.0))?;
        let tank_a2 = state.batch_api.register_container(container("T-A2", "GEO-A", 0.0))?;
        let pen_b1 = state.batch_api.register_container(container("P-B1", "GEO-B", 1_000.0))?;

        Ok(Self {
            _temp_file: temp_file,
            state,
            species_id: species.species_id,
            stage_egg_id: egg.stage_id,
            stage_smolt_id: smolt.stage_id,
            tank_a1,
            tank_a2,
            pen_b1,
        })
    }

    /// 新建 PLANNED 批次
    pub fn create_batch(&self, batch_number: &str, stage_id: &str) -> Batch {
        self.state
            .batch_api
            .create_batch(CreateBatchRequest {
                batch_number: batch_number.to_string(),
                species_id: self.species_id.clone(),
                lifecycle_stage_id: stage_id.to_string(),
                batch_type: BatchType::Standard,
                start_date: date(2026, 3, 1),
                expected_end_date: None,
                notes: None,
            })
            .expect("创建批次失败")
    }

    /// 新建在养分配
    pub fn create_assignment(
        &self,
        batch: &Batch,
        container: &Container,
        population_count: i64,
        avg_weight_g: f64,
    ) -> ContainerAssignment {
        self.state
            .batch_api
            .create_assignment(CreateAssignmentRequest {
                batch_id: batch.batch_id.clone(),
                container_id: container.container_id.clone(),
                lifecycle_stage_id: None,
                population_count,
                avg_weight_g,
                assignment_date: date(2026, 3, 1),
                notes: None,
            })
            .expect("创建分配失败")
    }
}

pub fn container(container_id: &str, geography_id: &str, max_biomass_kg: f64) -> Container {
    Container {
        container_id: container_id.to_string(),
        name: container_id.to_string(),
        container_type: "TANK".to_string(),
        geography_id: geography_id.to_string(),
        area_id: None,
        max_biomass_kg,
        active: true,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
