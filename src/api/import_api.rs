// ==========================================
// 养殖批次运营核心 - 抽样导入 API
// ==========================================
// 职责: 封装生长抽样文件导入 (CSV / Excel)
// ==========================================

use std::path::Path;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::importer::{GrowthImportReport, GrowthSampleImporter, GrowthSampleImporterImpl};
use crate::repository::{AssignmentRepository, GrowthSampleRepository};

/// 导入API
pub struct ImportApi {
    importer: GrowthSampleImporterImpl,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(sample_repo: Arc<GrowthSampleRepository>, assignment_repo: Arc<AssignmentRepository>) -> Self {
        Self {
            importer: GrowthSampleImporterImpl::new(sample_repo, assignment_repo),
        }
    }

    /// 导入生长抽样
    ///
    /// 按扩展名选择解析器: .csv / .xlsx / .xls
    ///
    /// # 返回
    /// - Ok(GrowthImportReport): 导入报告 (含逐行失败原因)
    /// - Err(ApiError): 文件不存在、格式不支持或落库失败
    pub async fn import_growth_samples(&self, file_path: &str) -> ApiResult<GrowthImportReport> {
        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", file_path)));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let report = match extension.as_str() {
            "csv" => self.importer.import_from_csv(path).await?,
            "xlsx" | "xls" => self.importer.import_from_excel(path).await?,
            other => {
                return Err(ApiError::ImportError(format!(
                    "不支持的文件格式: .{}, 仅支持 .csv / .xlsx / .xls",
                    other
                )))
            }
        };
        Ok(report)
    }

    /// 批量导入多个文件 (逐文件报告)
    pub async fn import_many(&self, file_paths: Vec<String>) -> Vec<Result<GrowthImportReport, String>> {
        self.importer.batch_import(file_paths).await
    }
}
