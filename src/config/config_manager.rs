// ==========================================
// 养殖批次运营核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::types::{AggregationLevel, TimeInterval};
use crate::engine::fcr_trends::{ConfidenceThresholds, FcrQueryDefaults};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置; 解析失败时告警并回落默认值
    fn get_parsed<T: FromStr + Copy>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_global_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 获取所有 global 配置的快照 (JSON)
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let config_map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::Other(anyhow::Error::new(e)))
    }

    // ===== FCR 趋势配置 =====

    /// FCR 查询默认值 (时间粒度/聚合层级/回溯天数)
    pub fn get_fcr_defaults(&self) -> RepositoryResult<FcrQueryDefaults> {
        let fallback = FcrQueryDefaults::default();

        let interval_raw = self.get_config_or_default(config_keys::FCR_DEFAULT_INTERVAL, "DAILY")?;
        let interval = TimeInterval::from_str(&interval_raw).unwrap_or_else(|e| {
            tracing::warn!(config_key = config_keys::FCR_DEFAULT_INTERVAL, error = %e, "使用默认时间粒度");
            fallback.interval
        });

        let level_raw =
            self.get_config_or_default(config_keys::FCR_DEFAULT_AGGREGATION_LEVEL, "GEOGRAPHY")?;
        let aggregation_level = AggregationLevel::from_str(&level_raw).unwrap_or_else(|e| {
            tracing::warn!(config_key = config_keys::FCR_DEFAULT_AGGREGATION_LEVEL, error = %e, "使用默认聚合层级");
            fallback.aggregation_level
        });

        let lookback_days = self
            .get_parsed(config_keys::FCR_DEFAULT_LOOKBACK_DAYS, fallback.lookback_days)?
            .max(0);

        Ok(FcrQueryDefaults {
            interval,
            aggregation_level,
            lookback_days,
        })
    }

    /// FCR 置信度阈值 (按桶内生长观测数)
    pub fn get_confidence_thresholds(&self) -> RepositoryResult<ConfidenceThresholds> {
        let fallback = ConfidenceThresholds::default();
        Ok(ConfidenceThresholds {
            very_high_min_samples: self.get_parsed(
                config_keys::FCR_CONFIDENCE_VERY_HIGH_MIN_SAMPLES,
                fallback.very_high_min_samples,
            )?,
            high_min_samples: self.get_parsed(
                config_keys::FCR_CONFIDENCE_HIGH_MIN_SAMPLES,
                fallback.high_min_samples,
            )?,
            medium_min_samples: self.get_parsed(
                config_keys::FCR_CONFIDENCE_MEDIUM_MIN_SAMPLES,
                fallback.medium_min_samples,
            )?,
        })
    }

    // ===== 工作流 / 容器配置 =====

    pub fn get_workflow_number_prefix(&self) -> RepositoryResult<String> {
        let prefix = self.get_config_or_default(config_keys::WORKFLOW_NUMBER_PREFIX, "CRT")?;
        let prefix = prefix.trim().to_uppercase();
        Ok(if prefix.is_empty() { "CRT".to_string() } else { prefix })
    }

    pub fn is_capacity_check_enabled(&self) -> RepositoryResult<bool> {
        let raw = self.get_config_or_default(config_keys::CONTAINER_CAPACITY_CHECK_ENABLED, "true")?;
        Ok(!matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        ))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // FCR 趋势
    pub const FCR_DEFAULT_INTERVAL: &str = "fcr.default_interval";
    pub const FCR_DEFAULT_AGGREGATION_LEVEL: &str = "fcr.default_aggregation_level";
    pub const FCR_DEFAULT_LOOKBACK_DAYS: &str = "fcr.default_lookback_days";
    pub const FCR_CONFIDENCE_VERY_HIGH_MIN_SAMPLES: &str = "fcr.confidence_very_high_min_samples";
    pub const FCR_CONFIDENCE_HIGH_MIN_SAMPLES: &str = "fcr.confidence_high_min_samples";
    pub const FCR_CONFIDENCE_MEDIUM_MIN_SAMPLES: &str = "fcr.confidence_medium_min_samples";

    // 工作流编号
    pub const WORKFLOW_NUMBER_PREFIX: &str = "workflow.number_prefix";

    // 容器容量校验
    pub const CONTAINER_CAPACITY_CHECK_ENABLED: &str = "container.capacity_check_enabled";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, initialize_schema};

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        ConfigManager::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_without_rows() {
        let cm = manager();
        let d = cm.get_fcr_defaults().unwrap();
        assert_eq!(d.interval, TimeInterval::Daily);
        assert_eq!(d.aggregation_level, AggregationLevel::Geography);
        assert_eq!(d.lookback_days, 365);
        assert_eq!(cm.get_workflow_number_prefix().unwrap(), "CRT");
        assert!(cm.is_capacity_check_enabled().unwrap());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cm = manager();
        cm.set_global_config_value(config_keys::FCR_DEFAULT_INTERVAL, "weekly").unwrap();
        cm.set_global_config_value(config_keys::FCR_DEFAULT_LOOKBACK_DAYS, "abc").unwrap();
        cm.set_global_config_value(config_keys::FCR_CONFIDENCE_HIGH_MIN_SAMPLES, "7").unwrap();
        cm.set_global_config_value(config_keys::CONTAINER_CAPACITY_CHECK_ENABLED, "off").unwrap();

        let d = cm.get_fcr_defaults().unwrap();
        assert_eq!(d.interval, TimeInterval::Weekly);
        assert_eq!(d.lookback_days, 365);
        assert_eq!(cm.get_confidence_thresholds().unwrap().high_min_samples, 7);
        assert!(!cm.is_capacity_check_enabled().unwrap());
    }

    #[test]
    fn test_snapshot_contains_keys() {
        let cm = manager();
        cm.set_global_config_value(config_keys::WORKFLOW_NUMBER_PREFIX, "EGG").unwrap();
        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get("workflow.number_prefix").map(String::as_str), Some("EGG"));
    }
}
