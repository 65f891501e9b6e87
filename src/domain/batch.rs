// ==========================================
// 养殖批次运营核心 - 批次与容器分配领域模型
// ==========================================
// 职责: 物种/生命阶段/容器/批次/容器分配
// 红线: biomass_kg 必须由 population_count × avg_weight_g 推导
// ==========================================

use crate::domain::types::{BatchStatus, BatchType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Species - 物种
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub species_id: String,
    pub name: String,
    pub scientific_name: Option<String>,
}

// ==========================================
// LifecycleStage - 生命阶段 (物种内有序)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleStage {
    pub stage_id: String,
    pub species_id: String,
    pub name: String,
    pub stage_order: i32, // 物种内顺序 (1 = 卵/仔鱼)
}

// ==========================================
// Container - 养殖容器
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub container_id: String,
    pub name: String,
    pub container_type: String,     // TANK / PEN / TRAY
    pub geography_id: String,       // 所属地域
    pub area_id: Option<String>,    // 海区 / 车间
    pub max_biomass_kg: f64,        // 容量上限 (校验用)
    pub active: bool,
}

// ==========================================
// Batch - 养殖批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub batch_number: String,
    pub species_id: String,
    pub lifecycle_stage_id: String,
    pub status: BatchStatus,
    pub batch_type: BatchType,
    pub start_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ContainerAssignment - 批次容器分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerAssignment {
    pub assignment_id: String,
    pub batch_id: String,
    pub container_id: String,
    pub lifecycle_stage_id: String,
    pub population_count: i64,
    pub avg_weight_g: f64,
    pub biomass_kg: f64,
    pub assignment_date: NaiveDate,
    pub departure_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl ContainerAssignment {
    /// 由数量和均重计算生物量 (kg)
    pub fn compute_biomass_kg(population_count: i64, avg_weight_g: f64) -> f64 {
        round_to(population_count as f64 * avg_weight_g / 1000.0, 2)
    }

    /// 设置数量并同步生物量
    pub fn set_population(&mut self, population_count: i64) {
        self.population_count = population_count.max(0);
        self.biomass_kg = Self::compute_biomass_kg(self.population_count, self.avg_weight_g);
    }

    /// 设置均重并同步生物量
    pub fn set_avg_weight(&mut self, avg_weight_g: f64) {
        self.avg_weight_g = avg_weight_g.max(0.0);
        self.biomass_kg = Self::compute_biomass_kg(self.population_count, self.avg_weight_g);
    }

    /// 增加数量 (鱼卵入池, 可多次累加)
    pub fn add_population(&mut self, delta: i64) {
        self.set_population(self.population_count + delta);
        if delta > 0 {
            self.is_active = true;
        }
    }

    /// 扣减数量 (死亡/转出)
    pub fn remove_population(&mut self, count: i64) {
        self.set_population(self.population_count - count);
    }
}

/// 四舍五入到指定小数位
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> ContainerAssignment {
        ContainerAssignment {
            assignment_id: "A1".to_string(),
            batch_id: "B1".to_string(),
            container_id: "C1".to_string(),
            lifecycle_stage_id: "S1".to_string(),
            population_count: 0,
            avg_weight_g: 50.0,
            biomass_kg: 0.0,
            assignment_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            departure_date: None,
            is_active: false,
            notes: None,
        }
    }

    #[test]
    fn test_biomass_follows_population_and_weight() {
        let mut a = assignment();
        a.set_population(1000);
        assert_eq!(a.biomass_kg, 50.0);

        a.set_avg_weight(75.5);
        assert_eq!(a.biomass_kg, 75.5);

        a.remove_population(200);
        assert_eq!(a.population_count, 800);
        assert_eq!(a.biomass_kg, 60.4);
    }

    #[test]
    fn test_add_population_activates_assignment() {
        let mut a = assignment();
        a.add_population(79_200);
        a.add_population(69_300);
        assert!(a.is_active);
        assert_eq!(a.population_count, 148_500);
    }

    #[test]
    fn test_population_never_negative() {
        let mut a = assignment();
        a.set_population(10);
        a.remove_population(50);
        assert_eq!(a.population_count, 0);
        assert_eq!(a.biomass_kg, 0.0);
    }
}
