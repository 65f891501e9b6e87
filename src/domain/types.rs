// ==========================================
// 养殖批次运营核心 - 领域类型定义
// ==========================================
// 职责: 批次/工作流/死亡原因/统计口径等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Planned,   // 计划中(工作流草稿阶段)
    Receiving, // 接收中(已有鱼卵入池)
    Active,    // 在养
    Completed, // 已结束
    Cancelled, // 已取消
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl BatchStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PLANNED" => BatchStatus::Planned,
            "RECEIVING" => BatchStatus::Receiving,
            "ACTIVE" => BatchStatus::Active,
            "COMPLETED" => BatchStatus::Completed,
            "CANCELLED" => BatchStatus::Cancelled,
            _ => BatchStatus::Planned, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Planned => "PLANNED",
            BatchStatus::Receiving => "RECEIVING",
            BatchStatus::Active => "ACTIVE",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 批次类型 (Batch Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchType {
    Standard, // 单一来源
    Mixed,    // 混合批次
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl BatchType {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MIXED" => BatchType::Mixed,
            _ => BatchType::Standard,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchType::Standard => "STANDARD",
            BatchType::Mixed => "MIXED",
        }
    }
}

// ==========================================
// 批次创建工作流状态 (Workflow Status)
// ==========================================
// 流转: DRAFT → PLANNED → IN_PROGRESS → COMPLETED
//       DRAFT/PLANNED → CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,      // 草稿
    Planned,    // 已计划
    InProgress, // 执行中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl WorkflowStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DRAFT" => WorkflowStatus::Draft,
            "PLANNED" => WorkflowStatus::Planned,
            "IN_PROGRESS" => WorkflowStatus::InProgress,
            "COMPLETED" => WorkflowStatus::Completed,
            "CANCELLED" => WorkflowStatus::Cancelled,
            _ => WorkflowStatus::Draft,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Planned => "PLANNED",
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Cancelled => "CANCELLED",
        }
    }

    /// 终态: 不再接受任何变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Cancelled)
    }
}

// ==========================================
// 创建动作状态 (Creation Action Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,   // 待执行
    Completed, // 已执行
    Failed,    // 执行失败
    Skipped,   // 已跳过
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl ActionStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COMPLETED" => ActionStatus::Completed,
            "FAILED" => ActionStatus::Failed,
            "SKIPPED" => ActionStatus::Skipped,
            _ => ActionStatus::Pending,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "PENDING",
            ActionStatus::Completed => "COMPLETED",
            ActionStatus::Failed => "FAILED",
            ActionStatus::Skipped => "SKIPPED",
        }
    }
}

// ==========================================
// 鱼卵来源 (Egg Source Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EggSourceType {
    Internal, // 自有亲鱼产卵
    External, // 外部供应商采购
}

impl fmt::Display for EggSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl EggSourceType {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "INTERNAL" => EggSourceType::Internal,
            _ => EggSourceType::External,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EggSourceType::Internal => "INTERNAL",
            EggSourceType::External => "EXTERNAL",
        }
    }
}

// ==========================================
// 交付方式 (Delivery Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    Transport,        // 外部运输
    InternalTransfer, // 场内转运
}

impl DeliveryMethod {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "INTERNAL_TRANSFER" => DeliveryMethod::InternalTransfer,
            _ => DeliveryMethod::Transport,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Transport => "TRANSPORT",
            DeliveryMethod::InternalTransfer => "INTERNAL_TRANSFER",
        }
    }
}

// ==========================================
// 死亡原因 (Mortality Cause)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MortalityCause {
    Disease,       // 疾病
    Handling,      // 操作损伤
    Predation,     // 捕食
    Environmental, // 环境因素
    Unknown,       // 未知
    Other,         // 其他
}

impl fmt::Display for MortalityCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl MortalityCause {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DISEASE" => MortalityCause::Disease,
            "HANDLING" => MortalityCause::Handling,
            "PREDATION" => MortalityCause::Predation,
            "ENVIRONMENTAL" => MortalityCause::Environmental,
            "OTHER" => MortalityCause::Other,
            _ => MortalityCause::Unknown,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MortalityCause::Disease => "DISEASE",
            MortalityCause::Handling => "HANDLING",
            MortalityCause::Predation => "PREDATION",
            MortalityCause::Environmental => "ENVIRONMENTAL",
            MortalityCause::Unknown => "UNKNOWN",
            MortalityCause::Other => "OTHER",
        }
    }
}

// ==========================================
// FCR 时间粒度 (Time Interval)
// ==========================================
// DAILY: 自然日; WEEKLY: 周一至周日; MONTHLY: 自然月
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInterval {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInterval::Daily => write!(f, "DAILY"),
            TimeInterval::Weekly => write!(f, "WEEKLY"),
            TimeInterval::Monthly => write!(f, "MONTHLY"),
        }
    }
}

impl FromStr for TimeInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(TimeInterval::Daily),
            "WEEKLY" => Ok(TimeInterval::Weekly),
            "MONTHLY" => Ok(TimeInterval::Monthly),
            other => Err(format!("未知的时间粒度: {}", other)),
        }
    }
}

// ==========================================
// FCR 聚合层级 (Aggregation Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationLevel {
    Batch,      // 按批次
    Assignment, // 按容器分配
    Geography,  // 按地域
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationLevel::Batch => write!(f, "BATCH"),
            AggregationLevel::Assignment => write!(f, "ASSIGNMENT"),
            AggregationLevel::Geography => write!(f, "GEOGRAPHY"),
        }
    }
}

impl FromStr for AggregationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BATCH" => Ok(AggregationLevel::Batch),
            "ASSIGNMENT" | "CONTAINER_ASSIGNMENT" => Ok(AggregationLevel::Assignment),
            "GEOGRAPHY" => Ok(AggregationLevel::Geography),
            other => Err(format!("未知的聚合层级: {}", other)),
        }
    }
}

// ==========================================
// 置信度 (Confidence Level)
// ==========================================
// 顺序: Low < Medium < High < VeryHigh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "LOW"),
            ConfidenceLevel::Medium => write!(f, "MEDIUM"),
            ConfidenceLevel::High => write!(f, "HIGH"),
            ConfidenceLevel::VeryHigh => write!(f, "VERY_HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_status_db_roundtrip() {
        for status in [
            WorkflowStatus::Draft,
            WorkflowStatus::Planned,
            WorkflowStatus::InProgress,
            WorkflowStatus::Completed,
            WorkflowStatus::Cancelled,
        ] {
            assert_eq!(WorkflowStatus::from_str(status.to_db_str()), status);
        }
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(!WorkflowStatus::Planned.is_terminal());
    }

    #[test]
    fn test_interval_and_level_parsing() {
        assert_eq!("weekly".parse::<TimeInterval>(), Ok(TimeInterval::Weekly));
        assert!("hourly".parse::<TimeInterval>().is_err());
        assert_eq!(
            "container_assignment".parse::<AggregationLevel>(),
            Ok(AggregationLevel::Assignment)
        );
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&WorkflowStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let json = serde_json::to_string(&ConfidenceLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"VERY_HIGH\"");
    }
}
