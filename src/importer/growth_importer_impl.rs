// ==========================================
// 养殖批次运营核心 - 生长抽样导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射 → 分配校验 → 落库 (单事务)
// ==========================================

use crate::domain::growth::GrowthSample;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::GrowthSampleFieldMapper;
use crate::importer::file_parser::{CsvParser, ExcelParser};
use crate::importer::growth_importer_trait::{
    FileParser, GrowthImportReport, GrowthSampleImporter, ImportRowError, RawRow, SampleFieldMapper,
};
use crate::repository::{AssignmentRepository, GrowthSampleRepository};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// GrowthSampleImporterImpl - 生长抽样导入器
// ==========================================
pub struct GrowthSampleImporterImpl {
    sample_repo: Arc<GrowthSampleRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    field_mapper: Box<dyn SampleFieldMapper>,
}

impl GrowthSampleImporterImpl {
    pub fn new(sample_repo: Arc<GrowthSampleRepository>, assignment_repo: Arc<AssignmentRepository>) -> Self {
        Self {
            sample_repo,
            assignment_repo,
            field_mapper: Box::new(GrowthSampleFieldMapper),
        }
    }

    /// 解析后的统一导入流程
    fn import_rows(&self, file_path: &str, raw_rows: Vec<RawRow>, started: Instant) -> ImportResult<GrowthImportReport> {
        let import_id = Uuid::new_v4().to_string();
        let total_rows = raw_rows.len();
        info!(import_id = %import_id, total_rows, "文件解析完成");

        // === 步骤 2: 字段映射 ===
        let mut mapped: Vec<(usize, GrowthSample)> = Vec::with_capacity(total_rows);
        let mut row_errors: Vec<ImportRowError> = Vec::new();
        for (idx, row) in raw_rows.iter().enumerate() {
            let row_number = idx + 1;
            match self.field_mapper.map_to_sample(row, row_number) {
                Ok(sample) => mapped.push((row_number, sample)),
                Err(e) => {
                    warn!(row_number, error = %e, "字段映射失败");
                    row_errors.push(ImportRowError {
                        row_number,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // === 步骤 3: 分配存在性校验 ===
        let mut known: HashMap<String, bool> = HashMap::new();
        let mut valid: Vec<GrowthSample> = Vec::with_capacity(mapped.len());
        for (row_number, sample) in mapped {
            let exists = match known.get(&sample.assignment_id) {
                Some(v) => *v,
                None => {
                    let v = self.assignment_repo.find_by_id(&sample.assignment_id)?.is_some();
                    known.insert(sample.assignment_id.clone(), v);
                    v
                }
            };
            if exists {
                valid.push(sample);
            } else {
                let e = ImportError::UnknownAssignment {
                    row: row_number,
                    assignment_id: sample.assignment_id.clone(),
                };
                warn!(row_number, error = %e, "分配校验失败");
                row_errors.push(ImportRowError {
                    row_number,
                    reason: e.to_string(),
                });
            }
        }
        row_errors.sort_by_key(|e| e.row_number);
        debug!(valid = valid.len(), failed = row_errors.len(), "校验完成");

        // === 步骤 4: 落库 ===
        let imported = if valid.is_empty() {
            0
        } else {
            self.sample_repo.batch_insert(&valid)?
        };

        let report = GrowthImportReport {
            import_id,
            file_path: file_path.to_string(),
            total_rows,
            imported,
            failed: row_errors.len(),
            row_errors,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            import_id = %report.import_id,
            imported = report.imported,
            failed = report.failed,
            elapsed_ms = report.elapsed_ms,
            "抽样导入完成"
        );
        Ok(report)
    }

    fn import_with(&self, parser: &dyn FileParser, file_path: &Path) -> ImportResult<GrowthImportReport> {
        let started = Instant::now();
        let path_str = file_path.display().to_string();
        info!(file_path = %path_str, "开始导入生长抽样");

        let raw_rows = parser.parse_to_raw_records(file_path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        self.import_rows(&path_str, raw_rows, started)
    }
}

#[async_trait::async_trait]
impl GrowthSampleImporter for GrowthSampleImporterImpl {
    #[instrument(skip(self, file_path))]
    async fn import_from_csv<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<GrowthImportReport> {
        self.import_with(&CsvParser, file_path.as_ref())
    }

    #[instrument(skip(self, file_path))]
    async fn import_from_excel<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<GrowthImportReport> {
        self.import_with(&ExcelParser, file_path.as_ref())
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<GrowthImportReport, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let tasks = file_paths.into_iter().map(|path| async move {
            let path_ref = path.as_ref();
            let path_str = path_ref.display().to_string();
            let is_excel = matches!(
                path_ref.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
                Some("xlsx") | Some("xls")
            );
            let result = if is_excel {
                self.import_from_excel(path_ref).await
            } else {
                self.import_from_csv(path_ref).await
            };
            result.map_err(|e| {
                error!(file = %path_str, error = %e, "文件导入失败");
                format!("文件 {} 导入失败: {}", path_str, e)
            })
        });

        let results = join_all(tasks).await;
        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}
