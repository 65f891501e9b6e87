use chrono::{Duration, Local, NaiveDate};
use std::error::Error;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use aquafarm_core::api::{
    AddActionRequest, CreateAssignmentRequest, CreateBatchRequest, CreateWorkflowRequest, ExecuteActionRequest,
    ProjectionInput, RecordFeedingRequest, RecordGrowthSampleRequest, RecordMortalityRequest, SaveScenarioRequest,
};
use aquafarm_core::app::{get_default_db_path, AppState};
use aquafarm_core::domain::{Container, ContainerAssignment};
use aquafarm_core::{BatchType, EggSourceType, MortalityCause};

const SAMPLE_WEEKS: i64 = 12;

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;
    aquafarm_core::logging::init();

    let state = AppState::new(db_path.clone())?;
    let base_date = Local::now().date_naive() - Duration::weeks(SAMPLE_WEEKS);

    // ===== 主数据 =====
    let species = state.batch_api.register_species("Atlantic Salmon", Some("Salmo salar"))?;
    let mut stages = Vec::new();
    for (order, name) in ["Egg&Alevin", "Fry", "Parr", "Smolt", "Post-Smolt", "Adult"].iter().enumerate() {
        stages.push(
            state
                .batch_api
                .register_lifecycle_stage(&species.species_id, name, order as i32 + 1)?,
        );
    }

    let mut containers = Vec::new();
    for (geo, prefix, count) in [("FAROE", "FO-T", 4), ("SCOTLAND", "SC-P", 3)] {
        for i in 1..=count {
            containers.push(state.batch_api.register_container(Container {
                container_id: Uuid::new_v4().to_string(),
                name: format!("{}{:02}", prefix, i),
                container_type: if geo == "FAROE" { "TANK" } else { "PEN" }.to_string(),
                geography_id: geo.to_string(),
                area_id: Some(format!("{}-AREA-1", geo)),
                max_biomass_kg: 50_000.0,
                active: true,
            })?);
        }
    }

    // ===== 鱼卵批次: 创建工作流 =====
    let egg_batch = state.batch_api.create_batch(CreateBatchRequest {
        batch_number: format!("EGG-{}", base_date.format("%Y%m")),
        species_id: species.species_id.clone(),
        lifecycle_stage_id: stages[0].stage_id.clone(),
        batch_type: BatchType::Standard,
        start_date: base_date,
        expected_end_date: None,
        notes: Some("demo".to_string()),
    })?;
    let workflow = state.workflow_api.create_workflow(CreateWorkflowRequest {
        batch_id: egg_batch.batch_id.clone(),
        egg_source_type: EggSourceType::External,
        egg_production_id: None,
        external_supplier_id: Some("SUP-AQUAGEN".to_string()),
        external_supplier_batch_number: Some("AG-2026-17".to_string()),
        planned_start_date: Some(base_date),
        planned_completion_date: Some(base_date + Duration::days(7)),
        created_by: "seed".to_string(),
        notes: None,
    })?;
    let mut action_ids = Vec::new();
    for (container, eggs) in containers.iter().take(2).zip([100_000_i64, 150_000]) {
        let action = state.workflow_api.add_action(AddActionRequest {
            workflow_id: workflow.workflow_id.clone(),
            container_id: container.container_id.clone(),
            egg_count_planned: eggs,
            expected_delivery_date: base_date,
            delivery_method: None,
            notes: None,
        })?;
        action_ids.push(action.action_id);
    }
    state.workflow_api.plan_workflow(&workflow.workflow_id)?;
    for (action_id, mortality) in action_ids.iter().zip([1_000_i64, 2_000]) {
        state.workflow_api.execute_action(ExecuteActionRequest {
            action_id: action_id.clone(),
            mortality_on_arrival: mortality,
            water_temp_on_arrival: Some(8.5),
            executed_by: "seed".to_string(),
        })?;
    }

    // ===== 海水批次: 生长/死亡/投喂 =====
    let feed = state.feeding_api.register_feed("Grower 9mm", Some("BioMar"), Some("LARGE"))?;
    let stock = state
        .feeding_api
        .register_stock(&feed.feed_id, "SILO-01", 400_000.0, 20_000.0)?;

    let mut sea_assignments: Vec<ContainerAssignment> = Vec::new();
    for (i, container) in containers.iter().filter(|c| c.geography_id == "SCOTLAND").enumerate() {
        let batch = state.batch_api.create_batch(CreateBatchRequest {
            batch_number: format!("SEA-{}-{}", base_date.format("%Y"), i + 1),
            species_id: species.species_id.clone(),
            lifecycle_stage_id: stages[5].stage_id.clone(),
            batch_type: BatchType::Standard,
            start_date: base_date,
            expected_end_date: Some(base_date + Duration::days(540)),
            notes: None,
        })?;
        sea_assignments.push(state.batch_api.create_assignment(CreateAssignmentRequest {
            batch_id: batch.batch_id,
            container_id: container.container_id.clone(),
            lifecycle_stage_id: None,
            population_count: 10_000,
            avg_weight_g: 1_000.0,
            assignment_date: base_date,
            notes: None,
        })?);
    }

    for assignment in &sea_assignments {
        let mut weight = 1_000.0;
        for week in 0..=SAMPLE_WEEKS {
            let date = base_date + Duration::weeks(week);
            state.batch_api.record_growth_sample(RecordGrowthSampleRequest {
                assignment_id: assignment.assignment_id.clone(),
                sample_date: date,
                sample_size: 30,
                avg_weight_g: weight,
                avg_length_cm: Some(42.0 + week as f64 * 0.8),
                std_deviation_weight: Some(weight * 0.12),
                std_deviation_length: Some(2.1),
                notes: None,
            })?;
            weight *= 1.06;

            if week % 3 == 1 {
                state.batch_api.record_mortality(RecordMortalityRequest {
                    batch_id: assignment.batch_id.clone(),
                    assignment_id: Some(assignment.assignment_id.clone()),
                    event_date: date,
                    count: 25,
                    cause: if week % 2 == 0 { MortalityCause::Disease } else { MortalityCause::Handling },
                    biomass_kg: None,
                    description: None,
                })?;
            }
        }

        for day in 0..(SAMPLE_WEEKS * 7) {
            state.feeding_api.record_feeding(RecordFeedingRequest {
                assignment_id: assignment.assignment_id.clone(),
                feed_id: feed.feed_id.clone(),
                feed_stock_id: Some(stock.stock_id.clone()),
                feeding_date: base_date + Duration::days(day),
                amount_kg: 120.0 + day as f64 * 0.6,
                batch_biomass_kg: None,
                notes: None,
            })?;
        }

        state.fcr_api.save_scenario_projections(SaveScenarioRequest {
            scenario_id: None,
            name: format!("baseline {}", assignment.batch_id),
            batch_id: Some(assignment.batch_id.clone()),
            start_date: base_date,
            initial_count: 10_000,
            initial_weight_g: 1_000.0,
            projections: projections(base_date, SAMPLE_WEEKS * 7),
        })?;
    }

    println!("Seeded demo database: {}", db_path);
    println!("  workflow: {}", workflow.workflow_number);
    println!("  sea assignments: {}", sea_assignments.len());
    Ok(())
}

/// 日增重 0.85%, 饲料系数 1.15 的基线投影
fn projections(start: NaiveDate, days: i64) -> Vec<ProjectionInput> {
    let mut out = Vec::with_capacity(days as usize);
    let mut weight = 1_000.0_f64;
    let mut cumulative = 0.0;
    let population = 10_000.0;
    for day in 0..days {
        let biomass = weight * population / 1000.0;
        let next_weight = weight * 1.0085;
        let daily_feed = if day == 0 {
            0.0
        } else {
            (next_weight - weight) * population / 1000.0 * 1.15
        };
        cumulative += daily_feed;
        out.push(ProjectionInput {
            projection_date: start + Duration::days(day),
            day_number: day as i32,
            average_weight_g: weight,
            population,
            biomass_kg: biomass,
            daily_feed_kg: daily_feed,
            cumulative_feed_kg: cumulative,
        });
        weight = next_weight;
    }
    out
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}
