// ==========================================
// 养殖批次运营核心 - 导入层
// ==========================================
// 职责: 外部抽样数据导入
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod growth_importer_impl;
pub mod growth_importer_trait;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::GrowthSampleFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use growth_importer_impl::GrowthSampleImporterImpl;

// 重导出 Trait 接口
pub use growth_importer_trait::{
    FileParser, GrowthImportReport, GrowthSampleImporter, ImportRowError, RawRow, SampleFieldMapper,
};
