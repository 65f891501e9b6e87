// ==========================================
// ImportApi 集成测试
// ==========================================
// 测试范围:
// 1. CSV 抽样导入 (合法行落库, 非法行逐行报告)
// 2. 文件不存在 / 格式不支持
// 3. 批量导入
// ==========================================

mod test_helpers;

use std::io::Write;

use aquafarm_core::api::ApiError;
use tempfile::{Builder, NamedTempFile};
use test_helpers::TestEnv;

fn write_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("无法创建临时文件");
    file.write_all(content.as_bytes()).expect("写入失败");
    file.flush().expect("写入失败");
    file
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_import_csv_reports_bad_rows() {
    aquafarm_core::logging::init_test();
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("SMOLT-001", &env.stage_smolt_id);
    let assignment = env.create_assignment(&batch, &env.tank_a1, 1_000, 100.0);

    let csv = format!(
        "assignment_id,sample_date,sample_size,avg_weight_g,avg_length_cm,notes\n\
         {id},2026-03-01,30,100,20,first\n\
         NO-SUCH-ASSIGNMENT,2026-03-01,30,100,,\n\
         {id},2026-03-08,30,0,,\n\
         {id},2026-03-15,25,120,,\n",
        id = assignment.assignment_id
    );
    let file = write_file(".csv", &csv);

    let report = env
        .state
        .import_api
        .import_growth_samples(&path_of(&file))
        .await
        .unwrap();
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.imported, 2);
    assert_eq!(report.failed, 2);
    let failed_rows: Vec<usize> = report.row_errors.iter().map(|e| e.row_number).collect();
    assert_eq!(failed_rows, vec![2, 3]);

    let analysis = env.state.batch_api.get_growth_analysis(&batch.batch_id).unwrap();
    assert_eq!(analysis.samples.len(), 2);
    assert_eq!(analysis.samples[0].condition_factor, Some(1.25));
}

#[tokio::test]
async fn test_import_missing_or_unsupported_file() {
    let env = TestEnv::new().unwrap();

    let err = env
        .state
        .import_api
        .import_growth_samples("/nonexistent/samples.csv")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let file = write_file(".json", "{}");
    let err = env
        .state
        .import_api
        .import_growth_samples(&path_of(&file))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
}

#[tokio::test]
async fn test_import_many_reports_per_file() {
    let env = TestEnv::new().unwrap();
    let batch = env.create_batch("SMOLT-001", &env.stage_smolt_id);
    let assignment = env.create_assignment(&batch, &env.tank_a1, 1_000, 100.0);

    let good = write_file(
        ".csv",
        &format!(
            "assignment_id,sample_date,sample_size,avg_weight_g\n{},2026-03-01,30,100\n",
            assignment.assignment_id
        ),
    );

    let results = env
        .state
        .import_api
        .import_many(vec![path_of(&good), "/nonexistent/other.csv".to_string()])
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().imported, 1);
    assert!(results[1].is_err());
}
