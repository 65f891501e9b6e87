// ==========================================
// 养殖批次运营核心 - 批次 API
// ==========================================
// 职责: 批次/分配/抽样/死亡记录, 生长与死亡分析
// 约束: 写操作先校验再落库; 死亡扣减与事件写入同事务
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::api::validator::{require_text, validate_date_range, validate_mortality_count, CapacityValidator};
use crate::domain::batch::{round_to, Batch, Container, ContainerAssignment, LifecycleStage, Species};
use crate::domain::growth::GrowthSample;
use crate::domain::mortality::MortalityEvent;
use crate::domain::types::{BatchStatus, BatchType, MortalityCause};
use crate::engine::growth::{GrowthAnalysis, GrowthAnalyticsEngine};
use crate::engine::mortality::{MortalityAggregator, MortalitySummary};
use crate::perf::OpTimer;
use crate::repository::{
    AssignmentRepository, BatchRepository, ContainerRepository, GrowthSampleRepository, MortalityRepository,
    SpeciesRepository,
};

// ==========================================
// 请求结构
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_number: String,
    pub species_id: String,
    pub lifecycle_stage_id: String,
    pub batch_type: BatchType,
    pub start_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignmentRequest {
    pub batch_id: String,
    pub container_id: String,
    /// 缺省取批次当前阶段
    pub lifecycle_stage_id: Option<String>,
    pub population_count: i64,
    pub avg_weight_g: f64,
    pub assignment_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordGrowthSampleRequest {
    pub assignment_id: String,
    pub sample_date: NaiveDate,
    pub sample_size: i32,
    pub avg_weight_g: f64,
    pub avg_length_cm: Option<f64>,
    pub std_deviation_weight: Option<f64>,
    pub std_deviation_length: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMortalityRequest {
    pub batch_id: String,
    pub assignment_id: Option<String>,
    pub event_date: NaiveDate,
    pub count: i64,
    pub cause: MortalityCause,
    /// 缺省按 count × 均重 / 1000 估算
    pub biomass_kg: Option<f64>,
    pub description: Option<String>,
}

// ==========================================
// BatchApi - 批次 API
// ==========================================

/// 批次API
///
/// 职责：
/// 1. 主数据登记（物种、生命阶段、容器）
/// 2. 批次与容器分配（容量校验）
/// 3. 生长抽样与生长分析
/// 4. 死亡记录与死亡汇总
pub struct BatchApi {
    species_repo: Arc<SpeciesRepository>,
    batch_repo: Arc<BatchRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    container_repo: Arc<ContainerRepository>,
    sample_repo: Arc<GrowthSampleRepository>,
    mortality_repo: Arc<MortalityRepository>,
    capacity_validator: Arc<CapacityValidator>,
    growth_engine: GrowthAnalyticsEngine,
    mortality_aggregator: MortalityAggregator,
}

impl BatchApi {
    /// 创建新的BatchApi实例
    ///
    /// # 参数
    /// - species_repo: 物种/生命阶段仓储
    /// - batch_repo: 批次仓储
    /// - assignment_repo: 容器分配仓储
    /// - container_repo: 容器仓储
    /// - sample_repo: 生长抽样仓储
    /// - mortality_repo: 死亡事件仓储
    /// - capacity_validator: 容器容量校验器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        species_repo: Arc<SpeciesRepository>,
        batch_repo: Arc<BatchRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        container_repo: Arc<ContainerRepository>,
        sample_repo: Arc<GrowthSampleRepository>,
        mortality_repo: Arc<MortalityRepository>,
        capacity_validator: Arc<CapacityValidator>,
    ) -> Self {
        Self {
            species_repo,
            batch_repo,
            assignment_repo,
            container_repo,
            sample_repo,
            mortality_repo,
            capacity_validator,
            growth_engine: GrowthAnalyticsEngine::new(),
            mortality_aggregator: MortalityAggregator::new(),
        }
    }

    // ==========================================
    // 主数据
    // ==========================================

    pub fn register_species(&self, name: &str, scientific_name: Option<&str>) -> ApiResult<Species> {
        if name.trim().is_empty() {
            return Err(ApiError::invalid_field("name", "不能为空"));
        }
        let species = Species {
            species_id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            scientific_name: scientific_name.map(str::to_string),
        };
        self.species_repo.insert_species(&species)?;
        Ok(species)
    }

    pub fn register_lifecycle_stage(&self, species_id: &str, name: &str, stage_order: i32) -> ApiResult<LifecycleStage> {
        self.require_species(species_id)?;
        if name.trim().is_empty() {
            return Err(ApiError::invalid_field("name", "不能为空"));
        }
        let stage = LifecycleStage {
            stage_id: Uuid::new_v4().to_string(),
            species_id: species_id.to_string(),
            name: name.trim().to_string(),
            stage_order,
        };
        self.species_repo.insert_stage(&stage)?;
        Ok(stage)
    }

    pub fn register_container(&self, container: Container) -> ApiResult<Container> {
        let mut violations = Vec::new();
        require_text("name", &container.name, &mut violations);
        require_text("geography_id", &container.geography_id, &mut violations);
        if container.max_biomass_kg < 0.0 {
            violations.push(FieldViolation::new("max_biomass_kg", "不能为负"));
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }
        self.container_repo.insert(&container)?;
        Ok(container)
    }

    // ==========================================
    // 批次与分配
    // ==========================================

    /// 创建批次 (初始状态 PLANNED, 由创建工作流推进)
    #[instrument(skip(self, req), fields(batch_number = %req.batch_number))]
    pub fn create_batch(&self, req: CreateBatchRequest) -> ApiResult<Batch> {
        let _timer = OpTimer::start("create_batch");

        let mut violations = Vec::new();
        require_text("batch_number", &req.batch_number, &mut violations);
        if let Some(end) = req.expected_end_date {
            if end < req.start_date {
                violations.push(FieldViolation::new("expected_end_date", "不能早于开始日期"));
            }
        }
        if self.batch_repo.find_by_number(req.batch_number.trim())?.is_some() {
            violations.push(FieldViolation::new("batch_number", "批次号已存在"));
        }

        match self.species_repo.find_stage(&req.lifecycle_stage_id)? {
            None => violations.push(FieldViolation::new("lifecycle_stage_id", "生命阶段不存在")),
            Some(stage) if stage.species_id != req.species_id => {
                violations.push(FieldViolation::new("lifecycle_stage_id", "生命阶段不属于该物种"))
            }
            Some(_) => {}
        }
        if self.species_repo.find_species(&req.species_id)?.is_none() {
            violations.push(FieldViolation::new("species_id", "物种不存在"));
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        let now = chrono::Local::now().naive_local();
        let batch = Batch {
            batch_id: Uuid::new_v4().to_string(),
            batch_number: req.batch_number.trim().to_string(),
            species_id: req.species_id,
            lifecycle_stage_id: req.lifecycle_stage_id,
            status: BatchStatus::Planned,
            batch_type: req.batch_type,
            start_date: req.start_date,
            expected_end_date: req.expected_end_date,
            actual_end_date: None,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };
        self.batch_repo.insert(&batch)?;
        info!(batch_id = %batch.batch_id, "批次已创建");
        Ok(batch)
    }

    pub fn get_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Batch(id={})不存在", batch_id)))
    }

    pub fn list_assignments(&self, batch_id: &str) -> ApiResult<Vec<ContainerAssignment>> {
        self.get_batch(batch_id)?;
        Ok(self.assignment_repo.find_by_batch(batch_id)?)
    }

    /// 创建容器分配 (容量校验)
    #[instrument(skip(self, req), fields(batch_id = %req.batch_id, container_id = %req.container_id))]
    pub fn create_assignment(&self, req: CreateAssignmentRequest) -> ApiResult<ContainerAssignment> {
        let _timer = OpTimer::start("create_assignment");
        let batch = self.get_batch(&req.batch_id)?;
        self.container_repo
            .find_by_id(&req.container_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Container(id={})不存在", req.container_id)))?;

        let mut violations = Vec::new();
        if req.population_count < 0 {
            violations.push(FieldViolation::new("population_count", "不能为负"));
        }
        if req.avg_weight_g < 0.0 {
            violations.push(FieldViolation::new("avg_weight_g", "不能为负"));
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        let lifecycle_stage_id = req.lifecycle_stage_id.unwrap_or_else(|| batch.lifecycle_stage_id.clone());
        let mut assignment = ContainerAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            batch_id: batch.batch_id,
            container_id: req.container_id,
            lifecycle_stage_id,
            population_count: 0,
            avg_weight_g: req.avg_weight_g,
            biomass_kg: 0.0,
            assignment_date: req.assignment_date,
            departure_date: None,
            is_active: req.population_count > 0,
            notes: req.notes,
        };
        assignment.set_population(req.population_count);

        self.capacity_validator.validate_assignment(&assignment)?;
        self.assignment_repo.insert(&assignment)?;
        info!(
            assignment_id = %assignment.assignment_id,
            population_count = assignment.population_count,
            biomass_kg = assignment.biomass_kg,
            "容器分配已创建"
        );
        Ok(assignment)
    }

    /// 更新分配均重 (如抽样后同步), 生物量随之重算并重新校验容量
    pub fn update_assignment_weight(&self, assignment_id: &str, avg_weight_g: f64) -> ApiResult<ContainerAssignment> {
        if avg_weight_g <= 0.0 {
            return Err(ApiError::invalid_field("avg_weight_g", format!("必须大于 0: {}", avg_weight_g)));
        }
        let capacity_enabled = self.capacity_validator.is_enabled()?;
        let ((), assignment) = self
            .assignment_repo
            .modify(assignment_id, |conn, assignment| -> ApiResult<()> {
                assignment.set_avg_weight(avg_weight_g);
                CapacityValidator::validate_assignment_in(conn, assignment, capacity_enabled)
            })?;
        Ok(assignment)
    }

    // ==========================================
    // 生长抽样
    // ==========================================

    #[instrument(skip(self, req), fields(assignment_id = %req.assignment_id))]
    pub fn record_growth_sample(&self, req: RecordGrowthSampleRequest) -> ApiResult<GrowthSample> {
        self.require_assignment(&req.assignment_id)?;

        let mut violations = Vec::new();
        if req.sample_size <= 0 {
            violations.push(FieldViolation::new("sample_size", "必须大于 0"));
        }
        if req.avg_weight_g <= 0.0 {
            violations.push(FieldViolation::new("avg_weight_g", "必须大于 0"));
        }
        if matches!(req.avg_length_cm, Some(l) if l < 0.0) {
            violations.push(FieldViolation::new("avg_length_cm", "不能为负"));
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        let mut sample = GrowthSample {
            sample_id: Uuid::new_v4().to_string(),
            assignment_id: req.assignment_id,
            sample_date: req.sample_date,
            sample_size: req.sample_size,
            avg_weight_g: req.avg_weight_g,
            avg_length_cm: req.avg_length_cm,
            std_deviation_weight: req.std_deviation_weight,
            std_deviation_length: req.std_deviation_length,
            condition_factor: None,
            notes: req.notes,
        };
        sample.refresh_condition_factor();
        self.sample_repo.insert(&sample)?;
        debug!(sample_id = %sample.sample_id, condition_factor = ?sample.condition_factor, "抽样已记录");
        Ok(sample)
    }

    /// 批次生长分析 (按抽样日期排序, 日增重 / SGR / K)
    pub fn get_growth_analysis(&self, batch_id: &str) -> ApiResult<GrowthAnalysis> {
        let _timer = OpTimer::start("get_growth_analysis");
        self.get_batch(batch_id)?;
        let samples = self.sample_repo.find_by_batch(batch_id)?;
        Ok(self.growth_engine.analyze(batch_id, &samples))
    }

    // ==========================================
    // 死亡记录
    // ==========================================

    /// 记录死亡
    ///
    /// - 指定分配: 死亡数 <= 分配在养数量, 事件写入与分配扣减同事务
    /// - 未指定分配: 死亡数 <= 批次当前在养总数, 按在养数量比例分摊到各活跃分配后同事务扣减
    #[instrument(skip(self, req), fields(batch_id = %req.batch_id, count = req.count))]
    pub fn record_mortality(&self, req: RecordMortalityRequest) -> ApiResult<MortalityEvent> {
        let _timer = OpTimer::start("record_mortality");
        self.get_batch(&req.batch_id)?;
        if matches!(req.biomass_kg, Some(b) if b < 0.0) {
            return Err(ApiError::invalid_field("biomass_kg", "不能为负"));
        }

        let RecordMortalityRequest {
            batch_id,
            assignment_id,
            event_date,
            count,
            cause,
            biomass_kg,
            description,
        } = req;

        match assignment_id {
            Some(assignment_id) => {
                let event = self
                    .mortality_repo
                    .record_for_assignment(&assignment_id, |assignment| -> ApiResult<MortalityEvent> {
                        if assignment.batch_id != batch_id {
                            return Err(ApiError::invalid_field(
                                "assignment_id",
                                format!("分配 {} 不属于批次 {}", assignment.assignment_id, batch_id),
                            ));
                        }
                        validate_mortality_count(count, assignment.population_count)?;

                        let biomass_kg = biomass_kg
                            .unwrap_or_else(|| ContainerAssignment::compute_biomass_kg(count, assignment.avg_weight_g));
                        assignment.remove_population(count);
                        Ok(MortalityEvent {
                            event_id: Uuid::new_v4().to_string(),
                            batch_id: batch_id.clone(),
                            assignment_id: Some(assignment.assignment_id.clone()),
                            container_id: Some(assignment.container_id.clone()),
                            event_date,
                            count,
                            biomass_kg,
                            cause,
                            description,
                        })
                    })?;
                info!(event_id = %event.event_id, assignment_id = %assignment_id, "死亡已记录并扣减分配");
                Ok(event)
            }
            None => {
                let event = self
                    .mortality_repo
                    .record_for_batch(&batch_id, |assignments| -> ApiResult<MortalityEvent> {
                        let populations: Vec<i64> = assignments.iter().map(|a| a.population_count).collect();
                        validate_mortality_count(count, populations.iter().sum())?;

                        let shares = MortalityAggregator::allocate(&populations, count);
                        let mut estimated = 0.0;
                        for (assignment, share) in assignments.iter_mut().zip(shares) {
                            if share > 0 {
                                estimated += ContainerAssignment::compute_biomass_kg(share, assignment.avg_weight_g);
                                assignment.remove_population(share);
                            }
                        }
                        Ok(MortalityEvent {
                            event_id: Uuid::new_v4().to_string(),
                            batch_id: batch_id.clone(),
                            assignment_id: None,
                            container_id: None,
                            event_date,
                            count,
                            biomass_kg: biomass_kg.unwrap_or_else(|| round_to(estimated, 2)),
                            cause,
                            description,
                        })
                    })?;
                info!(event_id = %event.event_id, "批次级死亡已记录并分摊扣减");
                Ok(event)
            }
        }
    }

    /// 批次死亡汇总 (可选日期范围)
    pub fn get_mortality_summary(
        &self,
        batch_id: &str,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> ApiResult<MortalitySummary> {
        let _timer = OpTimer::start("get_mortality_summary");
        self.get_batch(batch_id)?;
        if let Some((start, end)) = date_range {
            validate_date_range(start, end)?;
        }
        let events = self.mortality_repo.find_by_batch(batch_id)?;
        let current_population = self.assignment_repo.current_population(batch_id)?;
        Ok(self
            .mortality_aggregator
            .summarize(batch_id, &events, current_population, date_range))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_species(&self, species_id: &str) -> ApiResult<Species> {
        self.species_repo
            .find_species(species_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Species(id={})不存在", species_id)))
    }

    fn require_assignment(&self, assignment_id: &str) -> ApiResult<ContainerAssignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContainerAssignment(id={})不存在", assignment_id)))
    }
}
