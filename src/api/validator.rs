// ==========================================
// 养殖批次运营核心 - 操作校验器
// ==========================================
// 职责: 写操作前的容量/数量/日期校验
// 约束: 容量为校验规则, 不是数据库约束 (可通过配置关闭)
// ==========================================

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::config::ConfigManager;
use crate::domain::batch::{round_to, Container, ContainerAssignment};
use crate::repository::batch_repo::active_biomass_in_container_in;
use crate::repository::container_repo::find_container_in;
use crate::repository::{AssignmentRepository, ContainerRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::Arc;

// ==========================================
// CapacityValidator - 容器容量校验器
// ==========================================
pub struct CapacityValidator {
    container_repo: Arc<ContainerRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    config: Arc<ConfigManager>,
}

impl CapacityValidator {
    pub fn new(
        container_repo: Arc<ContainerRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            container_repo,
            assignment_repo,
            config,
        }
    }

    /// 容量校验开关 (事务内校验前读取, 避免持锁期间再取连接)
    pub fn is_enabled(&self) -> ApiResult<bool> {
        Ok(self.config.is_capacity_check_enabled()?)
    }

    /// 校验分配变更后容器内活跃生物量不超过上限
    ///
    /// - 容器 max_biomass_kg <= 0 视为不限
    /// - 变更后的分配若不活跃则不计入
    pub fn validate_assignment(&self, assignment: &ContainerAssignment) -> ApiResult<()> {
        if !self.is_enabled()? {
            return Ok(());
        }
        let container = self
            .container_repo
            .find_by_id(&assignment.container_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Container(id={})不存在", assignment.container_id)))?;
        if container.max_biomass_kg <= 0.0 {
            return Ok(());
        }
        let others = self
            .assignment_repo
            .active_biomass_in_container(&container.container_id, Some(&assignment.assignment_id))?;
        check_capacity(&container, others, assignment)
    }

    /// 同 [`validate_assignment`](Self::validate_assignment), 在调用方持有的事务连接上执行
    pub fn validate_assignment_in(conn: &Connection, assignment: &ContainerAssignment, enabled: bool) -> ApiResult<()> {
        if !enabled {
            return Ok(());
        }
        let container = find_container_in(conn, &assignment.container_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Container(id={})不存在", assignment.container_id)))?;
        if container.max_biomass_kg <= 0.0 {
            return Ok(());
        }
        let others = active_biomass_in_container_in(conn, &container.container_id, Some(&assignment.assignment_id))?;
        check_capacity(&container, others, assignment)
    }
}

fn check_capacity(container: &Container, others: f64, assignment: &ContainerAssignment) -> ApiResult<()> {
    let own = if assignment.is_active { assignment.biomass_kg } else { 0.0 };
    let resulting = others + own;

    if resulting > container.max_biomass_kg {
        tracing::warn!(
            container_id = %container.container_id,
            max_biomass_kg = container.max_biomass_kg,
            resulting_biomass_kg = resulting,
            "容器容量超限"
        );
        return Err(ApiError::CapacityExceeded {
            container_id: container.container_id.clone(),
            max_biomass_kg: container.max_biomass_kg,
            resulting_biomass_kg: round_to(resulting, 2),
        });
    }
    Ok(())
}

// ==========================================
// 通用字段校验
// ==========================================

/// 死亡数必须为正且不超过分配在养数量
pub fn validate_mortality_count(count: i64, population_count: i64) -> ApiResult<()> {
    if count <= 0 {
        return Err(ApiError::invalid_field("count", format!("死亡数必须大于 0: {}", count)));
    }
    if count > population_count {
        return Err(ApiError::invalid_field(
            "count",
            format!("死亡数 {} 超过分配在养数量 {}", count, population_count),
        ));
    }
    Ok(())
}

/// 起止日期校验 (start <= end)
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::invalid_field(
            "start_date",
            format!("开始日期 {} 晚于结束日期 {}", start, end),
        ));
    }
    Ok(())
}

/// 必填文本字段
pub fn require_text(field: &str, value: &str, violations: &mut Vec<FieldViolation>) {
    if value.trim().is_empty() {
        violations.push(FieldViolation::new(field, "不能为空"));
    }
}
