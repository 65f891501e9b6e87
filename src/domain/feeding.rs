// ==========================================
// 养殖批次运营核心 - 投喂领域模型
// ==========================================
// 职责: 饲料 / 饲料库存 / 投喂事件
// 红线: 投喂必须同步扣减库存
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Feed - 饲料品种
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub feed_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub size_category: Option<String>, // MICRO / SMALL / MEDIUM / LARGE
}

// ==========================================
// FeedStock - 饲料库存
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStock {
    pub stock_id: String,
    pub feed_id: String,
    pub feed_container_id: String, // 料仓
    pub quantity_kg: f64,
    pub reorder_threshold_kg: f64,
}

impl FeedStock {
    /// 是否低于补货阈值
    pub fn is_below_reorder_threshold(&self) -> bool {
        self.quantity_kg <= self.reorder_threshold_kg
    }
}

// ==========================================
// FeedingEvent - 投喂事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedingEvent {
    pub event_id: String,
    pub batch_id: String,
    pub assignment_id: String,
    pub container_id: String,
    pub feed_id: String,
    pub feed_stock_id: Option<String>,
    pub feeding_date: NaiveDate,
    pub amount_kg: f64,
    pub batch_biomass_kg: Option<f64>,
    pub feeding_percentage: Option<f64>, // 投喂率 (占生物量 %)
    pub notes: Option<String>,
}
