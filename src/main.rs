// ==========================================
// 养殖批次运营核心 - 命令行入口
// ==========================================
// 用法:
//   aquafarm-core                         打印版本与数据库路径
//   aquafarm-core growth <batch_id>       生长分析 (JSON)
//   aquafarm-core mortality <batch_id>    死亡汇总 (JSON)
//   aquafarm-core fcr [batch_id]          FCR 趋势, 默认口径 (JSON)
//   aquafarm-core geography <geo> <start> <end>
//   aquafarm-core import <file>...        导入生长抽样 (CSV / Excel)
//   aquafarm-core config                  配置快照
// ==========================================

use std::error::Error;

use aquafarm_core::app::{get_default_db_path, AppState};
use aquafarm_core::db::DATE_FORMAT;
use aquafarm_core::engine::FcrTrendsQuery;
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    aquafarm_core::logging::init();

    let db_path = get_default_db_path();
    tracing::info!("{} v{}", aquafarm_core::APP_NAME, aquafarm_core::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let output = match args.first().map(String::as_str) {
        None => {
            println!("{} v{} ({})", aquafarm_core::APP_NAME, aquafarm_core::VERSION, state.db_path);
            return Ok(());
        }
        Some("growth") => {
            let batch_id = required(&args, 1, "batch_id")?;
            serde_json::to_string_pretty(&state.batch_api.get_growth_analysis(batch_id)?)?
        }
        Some("mortality") => {
            let batch_id = required(&args, 1, "batch_id")?;
            serde_json::to_string_pretty(&state.batch_api.get_mortality_summary(batch_id, None)?)?
        }
        Some("fcr") => {
            let query = FcrTrendsQuery {
                batch_id: args.get(1).cloned(),
                ..Default::default()
            };
            serde_json::to_string_pretty(&state.fcr_api.get_fcr_trends(query)?)?
        }
        Some("geography") => {
            let geography_id = required(&args, 1, "geography_id")?;
            let start = NaiveDate::parse_from_str(required(&args, 2, "start")?, DATE_FORMAT)?;
            let end = NaiveDate::parse_from_str(required(&args, 3, "end")?, DATE_FORMAT)?;
            serde_json::to_string_pretty(&state.dashboard_api.get_geography_summary(geography_id, start, end)?)?
        }
        Some("import") => {
            let files: Vec<String> = args.iter().skip(1).cloned().collect();
            if files.is_empty() {
                return Err("缺少参数: file".into());
            }
            let mut reports = Vec::new();
            for result in state.import_api.import_many(files).await {
                match result {
                    Ok(report) => reports.push(report),
                    Err(msg) => eprintln!("{}", msg),
                }
            }
            serde_json::to_string_pretty(&reports)?
        }
        Some("config") => state.config_api.get_config_snapshot()?,
        Some(other) => return Err(format!("未知命令: {}", other).into()),
    };

    println!("{}", output);
    Ok(())
}

fn required<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str, Box<dyn Error>> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("缺少参数: {}", name).into())
}
