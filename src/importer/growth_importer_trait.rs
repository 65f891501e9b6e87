// ==========================================
// 养殖批次运营核心 - 生长抽样导入 Trait
// ==========================================
// 职责: 定义抽样导入接口（不包含实现）
// ==========================================

use crate::domain::growth::GrowthSample;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 原始行记录 (表头 → 单元格文本)
pub type RawRow = HashMap<String, String>;

/// 单行导入失败明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row_number: usize, // 数据行号 (表头之后从 1 开始)
    pub reason: String,
}

/// 一次文件导入的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthImportReport {
    pub import_id: String,
    pub file_path: String,
    pub total_rows: usize,
    pub imported: usize,
    pub failed: usize,
    pub row_errors: Vec<ImportRowError>,
    pub elapsed_ms: u64,
}

// ==========================================
// GrowthSampleImporter Trait
// ==========================================
// 实现者: GrowthSampleImporterImpl
#[async_trait]
pub trait GrowthSampleImporter: Send + Sync {
    /// 从 CSV 文件导入抽样
    ///
    /// 映射/校验失败的行记录到 row_errors, 其余行单事务落库
    async fn import_from_csv<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<GrowthImportReport>;

    /// 从 Excel 文件导入抽样 (第一个工作表)
    async fn import_from_excel<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<GrowthImportReport>;

    /// 批量导入多个文件（并发执行, 单文件失败不影响其他文件）
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<GrowthImportReport, String>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

// ==========================================
// SampleFieldMapper Trait
// ==========================================
// 实现者: GrowthSampleFieldMapper
pub trait SampleFieldMapper: Send + Sync {
    /// 行记录 → GrowthSample (含 K 值推导)
    fn map_to_sample(&self, row: &RawRow, row_number: usize) -> ImportResult<GrowthSample>;
}
