// ==========================================
// WorkflowApi 集成测试
// ==========================================
// 测试范围:
// 1. 创建: 鱼卵来源校验, 工作流编号
// 2. 编排: 追加动作, 计划
// 3. 执行: 分配累加, 工作流/批次状态推进, 汇总
// 4. 取消: 执行前允许, 执行后拒绝
// ==========================================

mod test_helpers;

use aquafarm_core::api::{AddActionRequest, ApiError, CreateWorkflowRequest, ExecuteActionRequest};
use aquafarm_core::domain::{Batch, BatchCreationWorkflow, Container};
use aquafarm_core::{ActionStatus, BatchStatus, EggSourceType, WorkflowStatus};
use test_helpers::{date, TestEnv};

fn external_workflow(env: &TestEnv, batch: &Batch) -> BatchCreationWorkflow {
    env.state
        .workflow_api
        .create_workflow(CreateWorkflowRequest {
            batch_id: batch.batch_id.clone(),
            egg_source_type: EggSourceType::External,
            egg_production_id: None,
            external_supplier_id: Some("SUP-01".to_string()),
            external_supplier_batch_number: Some("LOT-7".to_string()),
            planned_start_date: Some(date(2026, 3, 1)),
            planned_completion_date: Some(date(2026, 3, 10)),
            created_by: "planner".to_string(),
            notes: None,
        })
        .expect("创建工作流失败")
}

fn add_action(env: &TestEnv, workflow_id: &str, container: &Container, eggs: i64) -> String {
    env.state
        .workflow_api
        .add_action(AddActionRequest {
            workflow_id: workflow_id.to_string(),
            container_id: container.container_id.clone(),
            egg_count_planned: eggs,
            expected_delivery_date: date(2026, 3, 2),
            delivery_method: None,
            notes: None,
        })
        .expect("追加动作失败")
        .action_id
}

fn execute(env: &TestEnv, action_id: &str, mortality: i64) -> Result<aquafarm_core::engine::ExecutionOutcome, ApiError> {
    env.state.workflow_api.execute_action(ExecuteActionRequest {
        action_id: action_id.to_string(),
        mortality_on_arrival: mortality,
        water_temp_on_arrival: Some(7.5),
        executed_by: "operator".to_string(),
    })
}

// ==========================================
// 完整流程
// ==========================================

#[test]
fn test_two_actions_full_lifecycle() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-001", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    assert_eq!(workflow.status, WorkflowStatus::Draft);
    assert!(workflow.workflow_number.starts_with("CRT-"));
    assert!(workflow.workflow_number.ends_with("-001"));

    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 100_000);
    let a2 = add_action(&env, &workflow.workflow_id, &env.tank_a2, 150_000);

    let planned = env.state.workflow_api.plan_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(planned.status, WorkflowStatus::Planned);
    assert_eq!(planned.total_actions, 2);
    assert_eq!(planned.total_eggs_planned, 250_000);

    // 第一次执行: IN_PROGRESS, 批次 RECEIVING
    let first = execute(&env, &a1, 1_000).unwrap();
    assert!(first.workflow_started);
    assert!(!first.workflow_completed);
    assert_eq!(first.workflow_status, WorkflowStatus::InProgress);
    assert_eq!(first.batch_status, BatchStatus::Receiving);
    assert_eq!(first.progress_percentage, 50.0);
    assert_eq!(env.state.batch_api.get_batch(&batch.batch_id).unwrap().status, BatchStatus::Receiving);

    // 已执行后不可取消
    let err = env
        .state
        .workflow_api
        .cancel_workflow(&workflow.workflow_id, "供应商延期", "planner")
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    // 最后一个动作: COMPLETED, 批次 ACTIVE
    let second = execute(&env, &a2, 2_000).unwrap();
    assert!(second.workflow_completed);
    assert_eq!(second.workflow_status, WorkflowStatus::Completed);
    assert_eq!(second.batch_status, BatchStatus::Active);

    let done = env.state.workflow_api.get_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(done.total_eggs_received, 247_000);
    assert_eq!(done.total_mortality_on_arrival, 3_000);
    assert_eq!(done.actions_completed, 2);
    assert_eq!(done.progress_percentage, 100.0);
    assert!(done.actual_start_date.is_some());
    assert!(done.actual_completion_date.is_some());

    let batch_after = env.state.batch_api.get_batch(&batch.batch_id).unwrap();
    assert_eq!(batch_after.status, BatchStatus::Active);

    let mut populations: Vec<i64> = env
        .state
        .batch_api
        .list_assignments(&batch.batch_id)
        .unwrap()
        .into_iter()
        .inspect(|a| assert!(a.is_active))
        .map(|a| a.population_count)
        .collect();
    populations.sort();
    assert_eq!(populations, vec![99_000, 148_000]);

    let actions = env.state.workflow_api.list_actions(&workflow.workflow_id).unwrap();
    assert!(actions.iter().all(|a| a.status == ActionStatus::Completed));
    assert_eq!(actions.iter().map(|a| a.action_number).collect::<Vec<_>>(), vec![1, 2]);

    // 已完成: 重复执行被拒绝
    let err = execute(&env, &a1, 0).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[test]
fn test_actions_into_same_container_accumulate() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-002", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);

    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 80_000);
    let a2 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 70_000);

    let actions = env.state.workflow_api.list_actions(&workflow.workflow_id).unwrap();
    assert_eq!(actions[0].dest_assignment_id, actions[1].dest_assignment_id);

    execute(&env, &a1, 800).unwrap();
    execute(&env, &a2, 700).unwrap();

    let assignments = env.state.batch_api.list_assignments(&batch.batch_id).unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].population_count, 148_500);
}

// ==========================================
// 重复与并发执行
// ==========================================

fn population_in(env: &TestEnv, batch: &Batch, container: &Container) -> i64 {
    env.state
        .batch_api
        .list_assignments(&batch.batch_id)
        .unwrap()
        .iter()
        .find(|a| a.container_id == container.container_id)
        .map(|a| a.population_count)
        .unwrap_or(0)
}

#[test]
fn test_repeated_execution_is_rejected_without_side_effects() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-003", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 80_000);
    add_action(&env, &workflow.workflow_id, &env.tank_a2, 70_000);

    execute(&env, &a1, 800).unwrap();
    let err = execute(&env, &a1, 0).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    let after = env.state.workflow_api.get_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(after.actions_completed, 1);
    assert_eq!(after.total_eggs_received, 79_200);
    assert_eq!(after.total_mortality_on_arrival, 800);
    assert_eq!(population_in(&env, &batch, &env.tank_a1), 79_200);
}

#[test]
fn test_concurrent_execution_of_one_action_applies_once() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-004", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 100_000);
    add_action(&env, &workflow.workflow_id, &env.tank_a2, 50_000);

    let callers = 8;
    let barrier = std::sync::Barrier::new(callers);
    let results: Vec<Result<_, ApiError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let (env, barrier, action_id) = (&env, &barrier, a1.clone());
                scope.spawn(move || {
                    barrier.wait();
                    execute(env, &action_id, 1_000)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        ApiError::InvalidStateTransition { .. } | ApiError::BusinessRuleViolation(_)
    )));

    let after = env.state.workflow_api.get_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(after.status, WorkflowStatus::InProgress);
    assert_eq!(after.actions_completed, 1);
    assert_eq!(after.total_eggs_received, 99_000);
    assert_eq!(after.total_mortality_on_arrival, 1_000);
    assert_eq!(population_in(&env, &batch, &env.tank_a1), 99_000);
}

#[test]
fn test_concurrent_actions_into_same_container_are_additive() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-005", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 80_000);
    let a2 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 70_000);

    let barrier = std::sync::Barrier::new(2);
    std::thread::scope(|scope| {
        let handles = [(a1, 800), (a2, 700)].map(|(action_id, mortality)| {
            let (env, barrier) = (&env, &barrier);
            scope.spawn(move || {
                barrier.wait();
                execute(env, &action_id, mortality)
            })
        });
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    });

    assert_eq!(population_in(&env, &batch, &env.tank_a1), 148_500);
    let after = env.state.workflow_api.get_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(after.status, WorkflowStatus::Completed);
    assert_eq!(after.total_eggs_received, 148_500);
    assert_eq!(after.actions_completed, 2);
    assert_eq!(env.state.batch_api.get_batch(&batch.batch_id).unwrap().status, BatchStatus::Active);
}

// ==========================================
// 校验与非法流转
// ==========================================

#[test]
fn test_egg_source_violations_are_field_level() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-003", &env.stage_egg_id);

    let err = env
        .state
        .workflow_api
        .create_workflow(CreateWorkflowRequest {
            batch_id: batch.batch_id.clone(),
            egg_source_type: EggSourceType::Internal,
            egg_production_id: None,
            external_supplier_id: Some("SUP-01".to_string()),
            external_supplier_batch_number: None,
            planned_start_date: None,
            planned_completion_date: None,
            created_by: "planner".to_string(),
            notes: None,
        })
        .unwrap_err();

    let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
    assert!(fields.contains(&"egg_production_id"));
    assert!(fields.contains(&"external_supplier_id"));
}

#[test]
fn test_cancel_before_execution() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-004", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    add_action(&env, &workflow.workflow_id, &env.tank_a1, 10_000);

    let cancelled = env
        .state
        .workflow_api
        .cancel_workflow(&workflow.workflow_id, "订单取消", "planner")
        .unwrap();
    assert_eq!(cancelled.status, WorkflowStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by.as_deref(), Some("planner"));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("订单取消"));
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(env.state.batch_api.get_batch(&batch.batch_id).unwrap().status, BatchStatus::Cancelled);

    let err = env
        .state
        .workflow_api
        .add_action(AddActionRequest {
            workflow_id: workflow.workflow_id.clone(),
            container_id: env.tank_a2.container_id.clone(),
            egg_count_planned: 1_000,
            expected_delivery_date: date(2026, 3, 3),
            delivery_method: None,
            notes: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[test]
fn test_plan_requires_actions() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-005", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);

    let err = env.state.workflow_api.plan_workflow(&workflow.workflow_id).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { ref operation, .. } if operation == "PLAN"));
}

#[test]
fn test_mortality_above_planned_rolls_nothing_forward() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("EGG-006", &env.stage_egg_id);
    let workflow = external_workflow(&env, &batch);
    let a1 = add_action(&env, &workflow.workflow_id, &env.tank_a1, 1_000);

    let err = execute(&env, &a1, 1_001).unwrap_err();
    assert_eq!(err.violations()[0].field, "mortality_on_arrival");

    let actions = env.state.workflow_api.list_actions(&workflow.workflow_id).unwrap();
    assert_eq!(actions[0].status, ActionStatus::Pending);
    let wf = env.state.workflow_api.get_workflow(&workflow.workflow_id).unwrap();
    assert_eq!(wf.status, WorkflowStatus::Draft);
    assert_eq!(wf.total_eggs_received, 0);
}

#[test]
fn test_workflow_numbers_are_sequential() {
    let env = TestEnv::new().unwrap();
    let b1 = env.create_batch("EGG-007", &env.stage_egg_id);
    let b2 = env.create_batch("EGG-008", &env.stage_egg_id);

    let w1 = external_workflow(&env, &b1);
    let w2 = external_workflow(&env, &b2);
    assert!(w1.workflow_number.ends_with("-001"));
    assert!(w2.workflow_number.ends_with("-002"));

    // 同一批次不允许并存两个未结束工作流
    let err = env
        .state
        .workflow_api
        .create_workflow(CreateWorkflowRequest {
            batch_id: b1.batch_id.clone(),
            egg_source_type: EggSourceType::External,
            egg_production_id: None,
            external_supplier_id: Some("SUP-02".to_string()),
            external_supplier_batch_number: None,
            planned_start_date: None,
            planned_completion_date: None,
            created_by: "planner".to_string(),
            notes: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_unknown_workflow_is_not_found() {
    let env = TestEnv::new().unwrap();
    let err = env.state.workflow_api.get_workflow("missing").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
