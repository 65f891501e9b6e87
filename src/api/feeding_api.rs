// ==========================================
// 养殖批次运营核心 - 投喂 API
// ==========================================
// 职责: 饲料/库存登记, 投喂记录 (库存扣减同事务), 投喂查询
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::api::validator::require_text;
use crate::domain::feeding::{Feed, FeedStock, FeedingEvent};
use crate::engine::feeding::{FeedingEngine, FeedingOutcome};
use crate::perf::OpTimer;
use crate::repository::{AssignmentRepository, FeedingRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFeedingRequest {
    pub assignment_id: String,
    pub feed_id: String,
    pub feed_stock_id: Option<String>,
    pub feeding_date: NaiveDate,
    pub amount_kg: f64,
    /// 缺省取分配当前生物量
    pub batch_biomass_kg: Option<f64>,
    pub notes: Option<String>,
}

/// 投喂记录结果 (事件 + 库存余量)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedingRecord {
    pub event: FeedingEvent,
    pub outcome: FeedingOutcome,
}

// ==========================================
// FeedingApi - 投喂 API
// ==========================================
pub struct FeedingApi {
    feeding_repo: Arc<FeedingRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    engine: FeedingEngine,
}

impl FeedingApi {
    /// 创建新的FeedingApi实例
    ///
    /// # 参数
    /// - feeding_repo: 饲料/库存/投喂仓储
    /// - assignment_repo: 容器分配仓储
    pub fn new(feeding_repo: Arc<FeedingRepository>, assignment_repo: Arc<AssignmentRepository>) -> Self {
        Self {
            feeding_repo,
            assignment_repo,
            engine: FeedingEngine::new(),
        }
    }

    pub fn register_feed(&self, name: &str, brand: Option<&str>, size_category: Option<&str>) -> ApiResult<Feed> {
        if name.trim().is_empty() {
            return Err(ApiError::invalid_field("name", "不能为空"));
        }
        let feed = Feed {
            feed_id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            brand: brand.map(str::to_string),
            size_category: size_category.map(str::to_string),
        };
        self.feeding_repo.insert_feed(&feed)?;
        Ok(feed)
    }

    pub fn register_stock(
        &self,
        feed_id: &str,
        feed_container_id: &str,
        quantity_kg: f64,
        reorder_threshold_kg: f64,
    ) -> ApiResult<FeedStock> {
        let mut violations = Vec::new();
        require_text("feed_container_id", feed_container_id, &mut violations);
        if quantity_kg < 0.0 {
            violations.push(FieldViolation::new("quantity_kg", "不能为负"));
        }
        if reorder_threshold_kg < 0.0 {
            violations.push(FieldViolation::new("reorder_threshold_kg", "不能为负"));
        }
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }
        self.feeding_repo
            .find_feed(feed_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Feed(id={})不存在", feed_id)))?;

        let stock = FeedStock {
            stock_id: Uuid::new_v4().to_string(),
            feed_id: feed_id.to_string(),
            feed_container_id: feed_container_id.to_string(),
            quantity_kg,
            reorder_threshold_kg,
        };
        self.feeding_repo.insert_stock(&stock)?;
        Ok(stock)
    }

    /// 记录投喂
    ///
    /// - 指定库存时, 库存余量 >= 投喂量, 扣减与事件写入同事务
    /// - 余量降至补货阈值以下时告警并在结果中标记
    #[instrument(skip(self, req), fields(assignment_id = %req.assignment_id, amount_kg = req.amount_kg))]
    pub fn record_feeding(&self, req: RecordFeedingRequest) -> ApiResult<FeedingRecord> {
        let _timer = OpTimer::start("record_feeding");
        let assignment = self
            .assignment_repo
            .find_by_id(&req.assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ContainerAssignment(id={})不存在", req.assignment_id)))?;
        self.feeding_repo
            .find_feed(&req.feed_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Feed(id={})不存在", req.feed_id)))?;

        let mut stock = match req.feed_stock_id.as_deref() {
            Some(stock_id) => Some(
                self.feeding_repo
                    .find_stock(stock_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("FeedStock(id={})不存在", stock_id)))?,
            ),
            None => None,
        };

        let mut event = FeedingEvent {
            event_id: Uuid::new_v4().to_string(),
            batch_id: assignment.batch_id.clone(),
            assignment_id: assignment.assignment_id.clone(),
            container_id: assignment.container_id.clone(),
            feed_id: req.feed_id,
            feed_stock_id: None,
            feeding_date: req.feeding_date,
            amount_kg: req.amount_kg,
            batch_biomass_kg: req.batch_biomass_kg.or(Some(assignment.biomass_kg)),
            feeding_percentage: None,
            notes: req.notes,
        };

        let outcome = self.engine.apply(&mut event, stock.as_mut())?;
        self.feeding_repo.insert_event(&event)?;

        if outcome.below_reorder_threshold {
            warn!(
                stock_id = ?event.feed_stock_id,
                remaining_kg = ?outcome.remaining_stock_kg,
                "饲料库存低于补货阈值"
            );
        }
        info!(
            event_id = %event.event_id,
            batch_id = %event.batch_id,
            feeding_percentage = ?event.feeding_percentage,
            "投喂已记录"
        );
        Ok(FeedingRecord { event, outcome })
    }

    pub fn list_feeding_for_batch(&self, batch_id: &str) -> ApiResult<Vec<FeedingEvent>> {
        Ok(self.feeding_repo.find_by_batch(batch_id)?)
    }

    pub fn get_stock(&self, stock_id: &str) -> ApiResult<FeedStock> {
        self.feeding_repo
            .find_stock(stock_id)?
            .ok_or_else(|| ApiError::NotFound(format!("FeedStock(id={})不存在", stock_id)))
    }
}
