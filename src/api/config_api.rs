// ==========================================
// 养殖批次运营核心 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照
// 约束: 仅允许已登记的配置键; 写入前按类型校验
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager};
use crate::domain::types::{AggregationLevel, TimeInterval};

/// 已登记配置键
const KNOWN_KEYS: &[&str] = &[
    config_keys::FCR_DEFAULT_INTERVAL,
    config_keys::FCR_DEFAULT_AGGREGATION_LEVEL,
    config_keys::FCR_DEFAULT_LOOKBACK_DAYS,
    config_keys::FCR_CONFIDENCE_VERY_HIGH_MIN_SAMPLES,
    config_keys::FCR_CONFIDENCE_HIGH_MIN_SAMPLES,
    config_keys::FCR_CONFIDENCE_MEDIUM_MIN_SAMPLES,
    config_keys::WORKFLOW_NUMBER_PREFIX,
    config_keys::CONTAINER_CAPACITY_CHECK_ENABLED,
];

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 全部 global 配置 (JSON 快照)
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config_manager.get_config_snapshot()?)
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        Self::check_key(key)?;
        Ok(self.config_manager.get_global_config_value(key)?)
    }

    /// 更新单个配置
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        Self::check_key(key)?;
        let value = value.trim();
        Self::check_value(key, value)?;
        self.config_manager.set_global_config_value(key, value)?;
        Ok(())
    }

    fn check_key(key: &str) -> ApiResult<()> {
        if KNOWN_KEYS.contains(&key) {
            Ok(())
        } else {
            Err(ApiError::invalid_field("key", format!("未知配置项: {}", key)))
        }
    }

    fn check_value(key: &str, value: &str) -> ApiResult<()> {
        let valid = match key {
            config_keys::FCR_DEFAULT_INTERVAL => value.parse::<TimeInterval>().is_ok(),
            config_keys::FCR_DEFAULT_AGGREGATION_LEVEL => value.parse::<AggregationLevel>().is_ok(),
            config_keys::FCR_DEFAULT_LOOKBACK_DAYS => matches!(value.parse::<i64>(), Ok(v) if v > 0),
            config_keys::FCR_CONFIDENCE_VERY_HIGH_MIN_SAMPLES
            | config_keys::FCR_CONFIDENCE_HIGH_MIN_SAMPLES
            | config_keys::FCR_CONFIDENCE_MEDIUM_MIN_SAMPLES => value.parse::<usize>().is_ok(),
            config_keys::WORKFLOW_NUMBER_PREFIX => {
                !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
            }
            config_keys::CONTAINER_CAPACITY_CHECK_ENABLED => {
                matches!(value.to_ascii_lowercase().as_str(), "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off")
            }
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(ApiError::invalid_field("value", format!("配置项 {} 的值无效: {}", key, value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_checks() {
        assert!(ConfigApi::check_value(config_keys::FCR_DEFAULT_INTERVAL, "WEEKLY").is_ok());
        assert!(ConfigApi::check_value(config_keys::FCR_DEFAULT_INTERVAL, "HOURLY").is_err());
        assert!(ConfigApi::check_value(config_keys::FCR_DEFAULT_LOOKBACK_DAYS, "0").is_err());
        assert!(ConfigApi::check_value(config_keys::WORKFLOW_NUMBER_PREFIX, "EGG").is_ok());
        assert!(ConfigApi::check_value(config_keys::WORKFLOW_NUMBER_PREFIX, "E-G").is_err());
        assert!(ConfigApi::check_key("plan.unknown").is_err());
    }
}
