// ==========================================
// 养殖批次运营核心 - 情景模型领域对象
// ==========================================
// 职责: 情景模型推演结果 (按日投影), 供 FCR 预测口径使用
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Scenario - 情景模型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    pub name: String,
    pub batch_id: Option<String>, // 关联批次 (FCR 预测匹配口径)
    pub start_date: NaiveDate,
    pub duration_days: i32,
    pub initial_count: i64,
    pub initial_weight_g: f64,
}

// ==========================================
// ScenarioProjection - 按日投影
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub scenario_id: String,
    pub projection_date: NaiveDate,
    pub day_number: i32,
    pub average_weight_g: f64,
    pub population: f64,
    pub biomass_kg: f64,
    pub daily_feed_kg: f64,
    pub cumulative_feed_kg: f64,
}
