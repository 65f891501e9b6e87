// ==========================================
// 养殖批次运营核心 - 投喂引擎
// ==========================================
// 职责: 投喂量校验, 投喂率计算, 库存扣减
// 红线: 库存不足不得投喂; 引擎只改内存对象
// ==========================================

use crate::domain::batch::round_to;
use crate::domain::feeding::{FeedStock, FeedingEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedingError {
    #[error("投喂量必须大于 0: {0}")]
    InvalidAmount(f64),

    #[error("库存不足: stock_id={stock_id}, available={available_kg}kg, requested={requested_kg}kg")]
    InsufficientStock {
        stock_id: String,
        available_kg: f64,
        requested_kg: f64,
    },

    #[error("库存饲料与投喂饲料不一致: stock_feed={stock_feed}, event_feed={event_feed}")]
    FeedMismatch { stock_feed: String, event_feed: String },
}

/// 投喂处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingOutcome {
    pub feeding_percentage: Option<f64>,
    pub remaining_stock_kg: Option<f64>,
    pub below_reorder_threshold: bool,
}

// ==========================================
// FeedingEngine - 投喂引擎
// ==========================================
pub struct FeedingEngine {
    // 无状态引擎
}

impl Default for FeedingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedingEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 投喂率 (%) = 投喂量 / 生物量 × 100
    pub fn feeding_percentage(amount_kg: f64, biomass_kg: Option<f64>) -> Option<f64> {
        match biomass_kg {
            Some(b) if b > 0.0 => Some(round_to(amount_kg / b * 100.0, 2)),
            _ => None,
        }
    }

    /// 应用投喂: 计算投喂率并扣减库存
    pub fn apply(
        &self,
        event: &mut FeedingEvent,
        stock: Option<&mut FeedStock>,
    ) -> Result<FeedingOutcome, FeedingError> {
        if event.amount_kg.is_nan() || event.amount_kg <= 0.0 {
            return Err(FeedingError::InvalidAmount(event.amount_kg));
        }

        event.feeding_percentage = Self::feeding_percentage(event.amount_kg, event.batch_biomass_kg);

        let (remaining_stock_kg, below_reorder_threshold) = match stock {
            Some(stock) => {
                if stock.feed_id != event.feed_id {
                    return Err(FeedingError::FeedMismatch {
                        stock_feed: stock.feed_id.clone(),
                        event_feed: event.feed_id.clone(),
                    });
                }
                if stock.quantity_kg < event.amount_kg {
                    return Err(FeedingError::InsufficientStock {
                        stock_id: stock.stock_id.clone(),
                        available_kg: stock.quantity_kg,
                        requested_kg: event.amount_kg,
                    });
                }
                stock.quantity_kg = round_to(stock.quantity_kg - event.amount_kg, 3);
                event.feed_stock_id = Some(stock.stock_id.clone());
                (Some(stock.quantity_kg), stock.is_below_reorder_threshold())
            }
            None => (None, false),
        };

        Ok(FeedingOutcome {
            feeding_percentage: event.feeding_percentage,
            remaining_stock_kg,
            below_reorder_threshold,
        })
    }
}
