// ==========================================
// ConfigApi 集成测试
// ==========================================
// 测试范围:
// 1. 配置更新与快照
// 2. 未知配置键 / 非法值
// 3. 配置对业务的生效 (FCR 默认值, 工作流编号前缀)
// ==========================================

mod test_helpers;

use aquafarm_core::api::CreateWorkflowRequest;
use aquafarm_core::config::config_keys;
use aquafarm_core::engine::FcrTrendsQuery;
use aquafarm_core::{AggregationLevel, EggSourceType, TimeInterval};
use test_helpers::{date, TestEnv};

#[test]
fn test_update_config_与快照() {
    let env = TestEnv::new().unwrap();

    env.state
        .config_api
        .update_config(config_keys::FCR_DEFAULT_INTERVAL, " WEEKLY ")
        .unwrap();
    assert_eq!(
        env.state.config_api.get_config(config_keys::FCR_DEFAULT_INTERVAL).unwrap().as_deref(),
        Some("WEEKLY")
    );

    let snapshot: serde_json::Value =
        serde_json::from_str(&env.state.config_api.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::FCR_DEFAULT_INTERVAL], "WEEKLY");
}

#[test]
fn test_update_config_非法键与值() {
    let env = TestEnv::new().unwrap();

    let err = env.state.config_api.update_config("plan.unknown", "1").unwrap_err();
    assert_eq!(err.violations()[0].field, "key");

    let err = env
        .state
        .config_api
        .update_config(config_keys::FCR_DEFAULT_LOOKBACK_DAYS, "-5")
        .unwrap_err();
    assert_eq!(err.violations()[0].field, "value");

    let err = env
        .state
        .config_api
        .update_config(config_keys::CONTAINER_CAPACITY_CHECK_ENABLED, "maybe")
        .unwrap_err();
    assert_eq!(err.violations()[0].field, "value");
}

#[test]
fn test_fcr_defaults_follow_config() {
    let env = TestEnv::new().unwrap();
    env.state
        .config_api
        .update_config(config_keys::FCR_DEFAULT_INTERVAL, "WEEKLY")
        .unwrap();
    env.state
        .config_api
        .update_config(config_keys::FCR_DEFAULT_AGGREGATION_LEVEL, "BATCH")
        .unwrap();
    env.state
        .config_api
        .update_config(config_keys::FCR_DEFAULT_LOOKBACK_DAYS, "30")
        .unwrap();

    let trends = env
        .state
        .fcr_api
        .get_fcr_trends(FcrTrendsQuery {
            end_date: Some(date(2026, 3, 31)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(trends.interval, TimeInterval::Weekly);
    assert_eq!(trends.aggregation_level, AggregationLevel::Batch);
    assert_eq!(trends.start_date, date(2026, 3, 1));
}

#[test]
fn test_workflow_prefix_follows_config() {
    let env = TestEnv::new().unwrap();
    env.state
        .config_api
        .update_config(config_keys::WORKFLOW_NUMBER_PREFIX, "EGG")
        .unwrap();

    let batch = env.create_batch("EGG-001", &env.stage_egg_id);
    let workflow = env
        .state
        .workflow_api
        .create_workflow(CreateWorkflowRequest {
            batch_id: batch.batch_id.clone(),
            egg_source_type: EggSourceType::External,
            egg_production_id: None,
            external_supplier_id: Some("SUP-01".to_string()),
            external_supplier_batch_number: None,
            planned_start_date: None,
            planned_completion_date: None,
            created_by: "planner".to_string(),
            notes: None,
        })
        .unwrap();
    assert!(workflow.workflow_number.starts_with("EGG-"));
    assert!(workflow.workflow_number.ends_with("-001"));
}
