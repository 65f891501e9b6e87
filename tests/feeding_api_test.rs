// ==========================================
// FeedingApi 集成测试
// ==========================================
// 测试范围:
// 1. 投喂率 (默认取分配生物量)
// 2. 库存扣减与补货阈值
// 3. 库存不足/投喂量非法时不落库
// ==========================================

mod test_helpers;

use aquafarm_core::api::{ApiError, RecordFeedingRequest};
use test_helpers::{date, TestEnv};

fn feeding(assignment_id: &str, feed_id: &str, stock_id: Option<&str>, amount_kg: f64) -> RecordFeedingRequest {
    RecordFeedingRequest {
        assignment_id: assignment_id.to_string(),
        feed_id: feed_id.to_string(),
        feed_stock_id: stock_id.map(str::to_string),
        feeding_date: date(2026, 3, 5),
        amount_kg,
        batch_biomass_kg: None,
        notes: None,
    }
}

#[test]
fn test_feeding_decrements_stock_and_flags_reorder() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("SMOLT-001", &env.stage_smolt_id);
    // 1,000 × 100 g = 100 kg
    let assignment = env.create_assignment(&batch, &env.tank_a1, 1_000, 100.0);

    let feed = env.state.feeding_api.register_feed("Starter 2mm", Some("BioMar"), Some("SMALL")).unwrap();
    let stock = env
        .state
        .feeding_api
        .register_stock(&feed.feed_id, "SILO-1", 100.0, 30.0)
        .unwrap();

    let first = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed.feed_id, Some(&stock.stock_id), 5.0))
        .unwrap();
    assert_eq!(first.event.batch_biomass_kg, Some(100.0));
    assert_eq!(first.event.feeding_percentage, Some(5.0));
    assert_eq!(first.outcome.remaining_stock_kg, Some(95.0));
    assert!(!first.outcome.below_reorder_threshold);

    let second = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed.feed_id, Some(&stock.stock_id), 70.0))
        .unwrap();
    assert_eq!(second.outcome.remaining_stock_kg, Some(25.0));
    assert!(second.outcome.below_reorder_threshold);
    assert_eq!(env.state.feeding_api.get_stock(&stock.stock_id).unwrap().quantity_kg, 25.0);

    // 库存不足: 事件与扣减都不落库
    let err = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed.feed_id, Some(&stock.stock_id), 30.0))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    assert_eq!(env.state.feeding_api.get_stock(&stock.stock_id).unwrap().quantity_kg, 25.0);
    assert_eq!(env.state.feeding_api.list_feeding_for_batch(&batch.batch_id).unwrap().len(), 2);
}

#[test]
fn test_feeding_without_stock_and_invalid_amount() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("SMOLT-001", &env.stage_smolt_id);
    let assignment = env.create_assignment(&batch, &env.tank_a1, 2_000, 50.0);
    let feed = env.state.feeding_api.register_feed("Starter 1mm", None, None).unwrap();

    let mut req = feeding(&assignment.assignment_id, &feed.feed_id, None, 2.0);
    req.batch_biomass_kg = Some(80.0);
    let record = env.state.feeding_api.record_feeding(req).unwrap();
    assert_eq!(record.event.feeding_percentage, Some(2.5));
    assert_eq!(record.outcome.remaining_stock_kg, None);
    assert_eq!(record.event.container_id, env.tank_a1.container_id);

    let err = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed.feed_id, None, 0.0))
        .unwrap_err();
    assert_eq!(err.violations()[0].field, "amount_kg");
}

#[test]
fn test_stock_of_other_feed_is_rejected() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("SMOLT-001", &env.stage_smolt_id);
    let assignment = env.create_assignment(&batch, &env.tank_a1, 1_000, 100.0);
    let feed_a = env.state.feeding_api.register_feed("Feed A", None, None).unwrap();
    let feed_b = env.state.feeding_api.register_feed("Feed B", None, None).unwrap();
    let stock_b = env
        .state
        .feeding_api
        .register_stock(&feed_b.feed_id, "SILO-2", 500.0, 50.0)
        .unwrap();

    let err = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed_a.feed_id, Some(&stock_b.stock_id), 1.0))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let err = env
        .state
        .feeding_api
        .record_feeding(feeding(&assignment.assignment_id, &feed_a.feed_id, Some("missing"), 1.0))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
