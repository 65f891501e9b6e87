// ==========================================
// 养殖批次运营核心 - 地域 KPI 汇总引擎
// ==========================================
// 职责: 单个地域在统计期内的存栏/生物量/死亡/投喂/FCR 指标
// 输入: 地域容器 + 活跃分配 + 期内死亡/投喂/增重
// ==========================================

use crate::domain::batch::{round_to, Container, ContainerAssignment};
use crate::domain::feeding::FeedingEvent;
use crate::domain::mortality::MortalityEvent;
use crate::engine::fcr_trends::{feed_conversion_ratio, GainObservation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographySummary {
    pub geography_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub container_count: usize,
    pub active_container_count: usize,
    pub active_batch_count: usize,
    pub total_population: i64,
    pub total_biomass_kg: f64,
    pub avg_weight_g: Option<f64>, // 生物量加权均重
    pub mortality_count: i64,
    pub mortality_biomass_kg: f64,
    pub feed_kg: f64,
    pub biomass_gain_kg: f64,
    pub period_fcr: Option<f64>,
}

/// 地域汇总输入 (调用方已按地域过滤)
pub struct GeographyInputs<'a> {
    pub containers: &'a [Container],
    pub assignments: &'a [ContainerAssignment],
    pub mortality_events: &'a [MortalityEvent],
    pub feeding_events: &'a [FeedingEvent],
    pub gains: &'a [GainObservation],
}

// ==========================================
// GeographyKpiEngine - 地域 KPI 引擎
// ==========================================
pub struct GeographyKpiEngine {
    // 无状态引擎
}

impl Default for GeographyKpiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GeographyKpiEngine {
    pub fn new() -> Self {
        Self {}
    }

    pub fn summarize(
        &self,
        geography_id: &str,
        period: (NaiveDate, NaiveDate),
        inputs: &GeographyInputs<'_>,
    ) -> GeographySummary {
        let (start, end) = period;
        let in_period = |d: NaiveDate| d >= start && d <= end;

        let container_ids: HashSet<&str> = inputs
            .containers
            .iter()
            .filter(|c| c.geography_id == geography_id)
            .map(|c| c.container_id.as_str())
            .collect();

        let active: Vec<&ContainerAssignment> = inputs
            .assignments
            .iter()
            .filter(|a| a.is_active && container_ids.contains(a.container_id.as_str()))
            .collect();

        let active_containers: HashSet<&str> = active.iter().map(|a| a.container_id.as_str()).collect();
        let active_batches: HashSet<&str> = active.iter().map(|a| a.batch_id.as_str()).collect();

        let total_population: i64 = active.iter().map(|a| a.population_count).sum();
        let total_biomass: f64 = active.iter().map(|a| a.biomass_kg).sum();
        let avg_weight_g = if total_population > 0 {
            Some(round_to(total_biomass * 1000.0 / total_population as f64, 2))
        } else {
            None
        };

        let mortality: Vec<&MortalityEvent> = inputs
            .mortality_events
            .iter()
            .filter(|e| in_period(e.event_date))
            .filter(|e| match &e.container_id {
                Some(c) => container_ids.contains(c.as_str()),
                None => active_batches.contains(e.batch_id.as_str()),
            })
            .collect();

        let feed_kg: f64 = inputs
            .feeding_events
            .iter()
            .filter(|f| in_period(f.feeding_date) && container_ids.contains(f.container_id.as_str()))
            .map(|f| f.amount_kg)
            .sum();

        let biomass_gain_kg: f64 = inputs
            .gains
            .iter()
            .filter(|g| g.geography_id == geography_id && in_period(g.date))
            .map(|g| g.biomass_gain_kg)
            .sum();

        GeographySummary {
            geography_id: geography_id.to_string(),
            period_start: start,
            period_end: end,
            container_count: container_ids.len(),
            active_container_count: active_containers.len(),
            active_batch_count: active_batches.len(),
            total_population,
            total_biomass_kg: round_to(total_biomass, 2),
            avg_weight_g,
            mortality_count: mortality.iter().map(|e| e.count).sum(),
            mortality_biomass_kg: round_to(mortality.iter().map(|e| e.biomass_kg).sum(), 2),
            feed_kg: round_to(feed_kg, 2),
            biomass_gain_kg: round_to(biomass_gain_kg, 2),
            period_fcr: feed_conversion_ratio(feed_kg, biomass_gain_kg),
        }
    }
}
