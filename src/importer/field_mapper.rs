// ==========================================
// 养殖批次运营核心 - 抽样字段映射器
// ==========================================
// 职责: 源字段 → GrowthSample 映射 + 类型转换
// 标准表头: assignment_id, sample_date, sample_size, avg_weight_g,
//           avg_length_cm, std_deviation_weight, std_deviation_length, notes
// ==========================================

use crate::db::DATE_FORMAT;
use crate::domain::growth::GrowthSample;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::growth_importer_trait::{RawRow, SampleFieldMapper};
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

pub struct GrowthSampleFieldMapper;

impl SampleFieldMapper for GrowthSampleFieldMapper {
    fn map_to_sample(&self, row: &RawRow, row_number: usize) -> ImportResult<GrowthSample> {
        let assignment_id = self
            .get_string(row, "assignment_id")
            .ok_or_else(|| ImportError::MissingField {
                row: row_number,
                field: "assignment_id".to_string(),
            })?;

        let sample_date = self
            .parse_date(row, "sample_date", row_number)?
            .ok_or_else(|| ImportError::MissingField {
                row: row_number,
                field: "sample_date".to_string(),
            })?;

        let sample_size = self
            .parse_i32(row, "sample_size", row_number)?
            .ok_or_else(|| ImportError::MissingField {
                row: row_number,
                field: "sample_size".to_string(),
            })?;
        if sample_size <= 0 {
            return Err(ImportError::NonPositiveValue {
                row: row_number,
                field: "sample_size".to_string(),
                value: sample_size as f64,
            });
        }

        let avg_weight_g = self
            .parse_f64(row, "avg_weight_g", row_number)?
            .ok_or_else(|| ImportError::MissingField {
                row: row_number,
                field: "avg_weight_g".to_string(),
            })?;
        if avg_weight_g <= 0.0 {
            return Err(ImportError::NonPositiveValue {
                row: row_number,
                field: "avg_weight_g".to_string(),
                value: avg_weight_g,
            });
        }

        let mut sample = GrowthSample {
            sample_id: Uuid::new_v4().to_string(),
            assignment_id,
            sample_date,
            sample_size,
            avg_weight_g,
            avg_length_cm: self.parse_f64(row, "avg_length_cm", row_number)?,
            std_deviation_weight: self.parse_f64(row, "std_deviation_weight", row_number)?,
            std_deviation_length: self.parse_f64(row, "std_deviation_length", row_number)?,
            condition_factor: None,
            notes: self.get_string(row, "notes"),
        };
        sample.refresh_condition_factor();
        Ok(sample)
    }
}

impl GrowthSampleFieldMapper {
    /// 提取字符串字段，支持别名列名
    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        let aliases: &[&str] = match key {
            "assignment_id" => &["assignment_id", "分配ID", "容器分配"],
            "sample_date" => &["sample_date", "抽样日期"],
            "sample_size" => &["sample_size", "抽样尾数"],
            "avg_weight_g" => &["avg_weight_g", "平均体重(g)"],
            "avg_length_cm" => &["avg_length_cm", "平均体长(cm)"],
            "notes" => &["notes", "备注"],
            _ => &[],
        };

        std::iter::once(key)
            .chain(aliases.iter().copied())
            .filter_map(|alias| row.get(alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn parse_f64(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<f64>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: format!("无法解析为浮点数: {}", value),
                }),
        }
    }

    fn parse_i32(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<i32>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => {
                // Excel 数值单元格会带 ".0"
                let normalized = value.strip_suffix(".0").unwrap_or(&value);
                normalized
                    .parse::<i32>()
                    .map(Some)
                    .map_err(|_| ImportError::TypeConversionError {
                        row: row_number,
                        field: key.to_string(),
                        message: format!("无法解析为整数: {}", value),
                    })
            }
        }
    }

    /// 解析日期: YYYY-MM-DD, 或 Excel 日期序列号
    fn parse_date(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<NaiveDate>> {
        let value = match self.get_string(row, key) {
            None => return Ok(None),
            Some(v) => v,
        };

        let head = value.get(..10).unwrap_or(&value);
        if let Ok(date) = NaiveDate::parse_from_str(head, DATE_FORMAT) {
            return Ok(Some(date));
        }

        if let Ok(serial) = value.parse::<f64>() {
            if (1.0..2_958_466.0).contains(&serial) {
                let epoch = NaiveDate::from_ymd_opt(1899, 12, 30);
                if let Some(date) = epoch.and_then(|e| e.checked_add_signed(Duration::days(serial as i64))) {
                    return Ok(Some(date));
                }
            }
        }

        Err(ImportError::DateFormatError {
            row: row_number,
            field: key.to_string(),
            value,
        })
    }
}
