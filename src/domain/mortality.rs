// ==========================================
// 养殖批次运营核心 - 死亡事件领域模型
// ==========================================

use crate::domain::types::MortalityCause;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// MortalityEvent - 死亡事件
// ==========================================
// 口径: 批次 / 容器 / 日期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortalityEvent {
    pub event_id: String,
    pub batch_id: String,
    pub assignment_id: Option<String>,
    pub container_id: Option<String>,
    pub event_date: NaiveDate,
    pub count: i64,
    pub biomass_kg: f64,
    pub cause: MortalityCause,
    pub description: Option<String>,
}
