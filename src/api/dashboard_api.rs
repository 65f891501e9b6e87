// ==========================================
// 养殖批次运营核心 - 驾驶舱 API
// ==========================================
// 职责: 地域 KPI 汇总 (存栏/生物量/死亡/投喂/FCR)
// ==========================================

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::fcr_api::gains_for_assignments;
use crate::api::validator::validate_date_range;
use crate::engine::geography::{GeographyInputs, GeographyKpiEngine, GeographySummary};
use crate::perf::OpTimer;
use crate::repository::{
    AssignmentRepository, ContainerRepository, FeedingRepository, GrowthSampleRepository, MortalityRepository,
};

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    container_repo: Arc<ContainerRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    mortality_repo: Arc<MortalityRepository>,
    feeding_repo: Arc<FeedingRepository>,
    sample_repo: Arc<GrowthSampleRepository>,
    engine: GeographyKpiEngine,
}

impl DashboardApi {
    pub fn new(
        container_repo: Arc<ContainerRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        mortality_repo: Arc<MortalityRepository>,
        feeding_repo: Arc<FeedingRepository>,
        sample_repo: Arc<GrowthSampleRepository>,
    ) -> Self {
        Self {
            container_repo,
            assignment_repo,
            mortality_repo,
            feeding_repo,
            sample_repo,
            engine: GeographyKpiEngine::new(),
        }
    }

    /// 单个地域在统计期内的 KPI
    #[instrument(skip(self))]
    pub fn get_geography_summary(
        &self,
        geography_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ApiResult<GeographySummary> {
        let _timer = OpTimer::start("get_geography_summary");
        validate_date_range(start, end)?;

        let containers = self.container_repo.list_by_geography(geography_id)?;
        if containers.is_empty() {
            return Err(ApiError::NotFound(format!("Geography(id={})下无容器", geography_id)));
        }
        let container_ids: HashSet<&str> = containers.iter().map(|c| c.container_id.as_str()).collect();

        let assignments = self.assignment_repo.find_by_geography(geography_id)?;
        let mortality_events = self.mortality_repo.find_by_geography(geography_id, start, end)?;
        let feeding_events: Vec<_> = self
            .feeding_repo
            .find_in_range(start, end)?
            .into_iter()
            .filter(|e| container_ids.contains(e.container_id.as_str()))
            .collect();

        let geo_by_container: HashMap<String, String> = containers
            .iter()
            .map(|c| (c.container_id.clone(), c.geography_id.clone()))
            .collect();
        let gains = gains_for_assignments(&self.sample_repo, &assignments, &geo_by_container)?;

        Ok(self.engine.summarize(
            geography_id,
            (start, end),
            &GeographyInputs {
                containers: &containers,
                assignments: &assignments,
                mortality_events: &mortality_events,
                feeding_events: &feeding_events,
                gains: &gains,
            },
        ))
    }

    /// 全部地域的 KPI (按地域编号排序)
    pub fn list_geography_summaries(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<GeographySummary>> {
        validate_date_range(start, end)?;
        let geographies: BTreeSet<String> = self
            .container_repo
            .list_all()?
            .into_iter()
            .map(|c| c.geography_id)
            .collect();
        geographies
            .iter()
            .map(|g| self.get_geography_summary(g, start, end))
            .collect()
    }
}
