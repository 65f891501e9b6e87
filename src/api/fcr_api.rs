// ==========================================
// 养殖批次运营核心 - FCR 趋势 API
// ==========================================
// 职责: FCR 趋势查询 (默认值解析 + 观测装配), 情景投影写入
// 口径: 实际 FCR = 期内投喂 / 期内增重; 预测取关联批次的情景投影
// ==========================================

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::config::ConfigManager;
use crate::domain::batch::ContainerAssignment;
use crate::domain::scenario::{Scenario, ScenarioProjection};
use crate::engine::fcr_trends::{
    biomass_gains_from_samples, predictions_from_projections, AssignmentContext, FcrTrends, FcrTrendsEngine,
    FcrTrendsQuery, FeedObservation, GainObservation,
};
use crate::perf::OpTimer;
use crate::repository::{
    AssignmentRepository, BatchRepository, ContainerRepository, FeedingRepository, GrowthSampleRepository,
    RepositoryResult, ScenarioRepository,
};

/// 单日投影输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub projection_date: NaiveDate,
    pub day_number: i32,
    pub average_weight_g: f64,
    pub population: f64,
    pub biomass_kg: f64,
    pub daily_feed_kg: f64,
    pub cumulative_feed_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveScenarioRequest {
    /// 缺省新建情景; 指定时覆盖该情景的投影
    pub scenario_id: Option<String>,
    pub name: String,
    pub batch_id: Option<String>,
    pub start_date: NaiveDate,
    pub initial_count: i64,
    pub initial_weight_g: f64,
    pub projections: Vec<ProjectionInput>,
}

// ==========================================
// FcrApi - FCR 趋势 API
// ==========================================
pub struct FcrApi {
    feeding_repo: Arc<FeedingRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    container_repo: Arc<ContainerRepository>,
    sample_repo: Arc<GrowthSampleRepository>,
    scenario_repo: Arc<ScenarioRepository>,
    batch_repo: Arc<BatchRepository>,
    config: Arc<ConfigManager>,
}

impl FcrApi {
    /// 创建新的FcrApi实例
    ///
    /// # 参数
    /// - feeding_repo: 投喂仓储 (实际饲料)
    /// - assignment_repo / container_repo: 分配与地域上下文
    /// - sample_repo: 生长抽样仓储 (实际增重)
    /// - scenario_repo: 情景投影仓储 (预测)
    /// - batch_repo: 批次仓储
    /// - config: 配置管理器 (默认值与置信度阈值)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feeding_repo: Arc<FeedingRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        container_repo: Arc<ContainerRepository>,
        sample_repo: Arc<GrowthSampleRepository>,
        scenario_repo: Arc<ScenarioRepository>,
        batch_repo: Arc<BatchRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            feeding_repo,
            assignment_repo,
            container_repo,
            sample_repo,
            scenario_repo,
            batch_repo,
            config,
        }
    }

    // ==========================================
    // FCR 趋势
    // ==========================================

    /// 查询 FCR 趋势
    ///
    /// 未指定的 start/end/interval/aggregation_level 取配置默认值;
    /// batch_id / assignment_id / geography_id 为过滤条件 (可组合)
    #[instrument(skip(self, query))]
    pub fn get_fcr_trends(&self, query: FcrTrendsQuery) -> ApiResult<FcrTrends> {
        let _timer = OpTimer::start("get_fcr_trends");
        let defaults = self.config.get_fcr_defaults()?;
        let today = chrono::Local::now().date_naive();
        let resolved = query
            .resolve(today, &defaults)
            .map_err(|msg| ApiError::invalid_field("start_date", msg))?;

        if let Some(batch_id) = query.batch_id.as_deref() {
            self.batch_repo
                .find_by_id(batch_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Batch(id={})不存在", batch_id)))?;
        }

        let geo_by_container = self.geography_by_container()?;
        let assignments: Vec<ContainerAssignment> = self
            .assignment_repo
            .list_all()?
            .into_iter()
            .filter(|a| query.batch_id.as_deref().map_or(true, |b| a.batch_id == b))
            .filter(|a| query.assignment_id.as_deref().map_or(true, |id| a.assignment_id == id))
            .filter(|a| {
                query
                    .geography_id
                    .as_deref()
                    .map_or(true, |g| geo_by_container.get(&a.container_id).map(String::as_str) == Some(g))
            })
            .collect();
        let assignment_ids: BTreeSet<&str> = assignments.iter().map(|a| a.assignment_id.as_str()).collect();

        // 实际饲料
        let feed: Vec<FeedObservation> = self
            .feeding_repo
            .find_in_range(resolved.start_date, resolved.end_date)?
            .into_iter()
            .filter(|e| assignment_ids.contains(e.assignment_id.as_str()))
            .map(|e| FeedObservation {
                date: e.feeding_date,
                geography_id: geo_by_container.get(&e.container_id).cloned().unwrap_or_default(),
                batch_id: e.batch_id,
                assignment_id: e.assignment_id,
                feed_kg: e.amount_kg,
            })
            .collect();

        // 实际增重
        let gains = gains_for_assignments(&self.sample_repo, &assignments, &geo_by_container)?;

        // 预测 (按涉及批次)
        let batch_ids: BTreeSet<&str> = assignments.iter().map(|a| a.batch_id.as_str()).collect();
        let mut predictions = Vec::new();
        for batch_id in &batch_ids {
            for scenario in self.scenario_repo.find_by_batch(batch_id)? {
                let projections = self.scenario_repo.find_projections(&scenario.scenario_id)?;
                predictions.extend(predictions_from_projections(batch_id, &projections));
            }
        }

        debug!(
            assignments = assignments.len(),
            feed = feed.len(),
            gains = gains.len(),
            predictions = predictions.len(),
            "FCR 观测装配完成"
        );

        let engine = FcrTrendsEngine::new(self.config.get_confidence_thresholds()?);
        Ok(engine.compute(&resolved, &feed, &gains, &predictions))
    }

    // ==========================================
    // 情景投影
    // ==========================================

    /// 写入情景及日投影 (单事务)
    #[instrument(skip(self, req), fields(name = %req.name, projections = req.projections.len()))]
    pub fn save_scenario_projections(&self, req: SaveScenarioRequest) -> ApiResult<Scenario> {
        let mut violations = Vec::new();
        if req.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "不能为空"));
        }
        if req.projections.is_empty() {
            violations.push(FieldViolation::new("projections", "至少需要 1 天投影"));
        }
        let mut seen_days = BTreeSet::new();
        for p in &req.projections {
            if !seen_days.insert(p.day_number) {
                violations.push(FieldViolation::new("projections", format!("day_number 重复: {}", p.day_number)));
            }
            if p.projection_date < req.start_date {
                violations.push(FieldViolation::new(
                    "projections",
                    format!("投影日期 {} 早于情景开始日期", p.projection_date),
                ));
            }
            if p.biomass_kg < 0.0 || p.daily_feed_kg < 0.0 || p.population < 0.0 {
                violations.push(FieldViolation::new(
                    "projections",
                    format!("第 {} 天投影含负值", p.day_number),
                ));
            }
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        if let Some(batch_id) = req.batch_id.as_deref() {
            self.batch_repo
                .find_by_id(batch_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Batch(id={})不存在", batch_id)))?;
        }

        let scenario = Scenario {
            scenario_id: req.scenario_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: req.name.trim().to_string(),
            batch_id: req.batch_id,
            start_date: req.start_date,
            duration_days: req.projections.len() as i32,
            initial_count: req.initial_count,
            initial_weight_g: req.initial_weight_g,
        };
        let projections: Vec<ScenarioProjection> = req
            .projections
            .into_iter()
            .map(|p| ScenarioProjection {
                scenario_id: scenario.scenario_id.clone(),
                projection_date: p.projection_date,
                day_number: p.day_number,
                average_weight_g: p.average_weight_g,
                population: p.population,
                biomass_kg: p.biomass_kg,
                daily_feed_kg: p.daily_feed_kg,
                cumulative_feed_kg: p.cumulative_feed_kg,
            })
            .collect();

        let written = self.scenario_repo.save_with_projections(&scenario, &projections)?;
        info!(scenario_id = %scenario.scenario_id, written, "情景投影已写入");
        Ok(scenario)
    }

    fn geography_by_container(&self) -> RepositoryResult<HashMap<String, String>> {
        Ok(self
            .container_repo
            .list_all()?
            .into_iter()
            .map(|c| (c.container_id, c.geography_id))
            .collect())
    }
}

/// 由分配的生长抽样推导增重观测 (FCR 与地域汇总共用)
pub(crate) fn gains_for_assignments(
    sample_repo: &GrowthSampleRepository,
    assignments: &[ContainerAssignment],
    geo_by_container: &HashMap<String, String>,
) -> RepositoryResult<Vec<GainObservation>> {
    let mut gains = Vec::new();
    for a in assignments {
        let samples = sample_repo.find_by_assignment(&a.assignment_id)?;
        if samples.len() < 2 {
            continue;
        }
        let ctx = AssignmentContext {
            assignment_id: a.assignment_id.clone(),
            batch_id: a.batch_id.clone(),
            geography_id: geo_by_container.get(&a.container_id).cloned().unwrap_or_default(),
            population_count: a.population_count,
        };
        gains.extend(biomass_gains_from_samples(&ctx, &samples));
    }
    Ok(gains)
}
