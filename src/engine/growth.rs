// ==========================================
// 养殖批次运营核心 - 生长分析引擎
// ==========================================
// 职责: 由生长抽样序列计算增重/日增重/SGR/K 值汇总
// 输入: 批次下的生长抽样 (任意顺序)
// 输出: GrowthAnalysis (逐点 + 汇总)
// ==========================================

use crate::domain::batch::round_to;
use crate::domain::growth::GrowthSample;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 单个抽样点的分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSamplePoint {
    pub sample_id: String,
    pub sample_date: NaiveDate,
    pub avg_weight_g: f64,
    pub avg_length_cm: Option<f64>,
    pub condition_factor: Option<f64>,
    pub days_since_previous: Option<i64>,
    pub weight_gain_g: Option<f64>,
    pub daily_growth_g: Option<f64>,
    pub sgr_pct: Option<f64>,
}

/// 全序列汇总 (至少 2 个抽样)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub sample_count: usize,
    pub first_sample_date: NaiveDate,
    pub last_sample_date: NaiveDate,
    pub total_days: i64,
    pub total_weight_gain_g: f64,
    pub avg_daily_growth_g: Option<f64>,
    pub avg_sgr_pct: Option<f64>,
    pub min_weight_g: f64,
    pub max_weight_g: f64,
    pub avg_condition_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthAnalysis {
    pub batch_id: String,
    pub samples: Vec<GrowthSamplePoint>,
    pub summary: Option<GrowthSummary>,
}

// ==========================================
// GrowthAnalyticsEngine - 生长分析引擎
// ==========================================
pub struct GrowthAnalyticsEngine {
    // 无状态引擎
}

impl Default for GrowthAnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowthAnalyticsEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算 SGR (%/天)
    ///
    /// 仅当 days > 0 且前后体重均 > 0 时有值
    pub fn specific_growth_rate(prev_weight_g: f64, weight_g: f64, days: i64) -> Option<f64> {
        if days <= 0 || prev_weight_g <= 0.0 || weight_g <= 0.0 {
            return None;
        }
        Some((weight_g.ln() - prev_weight_g.ln()) / days as f64 * 100.0)
    }

    /// 分析批次的生长抽样序列
    pub fn analyze(&self, batch_id: &str, samples: &[GrowthSample]) -> GrowthAnalysis {
        let mut ordered: Vec<&GrowthSample> = samples.iter().collect();
        ordered.sort_by_key(|s| s.sample_date);

        let mut points = Vec::with_capacity(ordered.len());
        let mut total_gain = 0.0;
        let mut total_days = 0i64;
        let mut sgrs = Vec::new();

        for (idx, sample) in ordered.iter().enumerate() {
            let mut point = GrowthSamplePoint {
                sample_id: sample.sample_id.clone(),
                sample_date: sample.sample_date,
                avg_weight_g: sample.avg_weight_g,
                avg_length_cm: sample.avg_length_cm,
                condition_factor: sample
                    .condition_factor
                    .or_else(|| GrowthSample::compute_condition_factor(sample.avg_weight_g, sample.avg_length_cm)),
                days_since_previous: None,
                weight_gain_g: None,
                daily_growth_g: None,
                sgr_pct: None,
            };

            if idx > 0 {
                let prev = ordered[idx - 1];
                let days = (sample.sample_date - prev.sample_date).num_days();
                point.days_since_previous = Some(days);

                if days > 0 {
                    let gain = sample.avg_weight_g - prev.avg_weight_g;
                    point.weight_gain_g = Some(round_to(gain, 2));
                    point.daily_growth_g = Some(round_to(gain / days as f64, 2));
                    total_gain += gain;
                    total_days += days;

                    if let Some(sgr) =
                        Self::specific_growth_rate(prev.avg_weight_g, sample.avg_weight_g, days)
                    {
                        point.sgr_pct = Some(round_to(sgr, 2));
                        sgrs.push(sgr);
                    }
                }
            }

            points.push(point);
        }

        let summary = if ordered.len() >= 2 {
            let weights = ordered.iter().map(|s| s.avg_weight_g);
            let min_weight_g = weights.clone().fold(f64::INFINITY, f64::min);
            let max_weight_g = weights.fold(f64::NEG_INFINITY, f64::max);

            let k_values: Vec<f64> = points.iter().filter_map(|p| p.condition_factor).collect();
            let avg_condition_factor = if k_values.is_empty() {
                None
            } else {
                Some(round_to(k_values.iter().sum::<f64>() / k_values.len() as f64, 2))
            };

            Some(GrowthSummary {
                sample_count: ordered.len(),
                first_sample_date: ordered[0].sample_date,
                last_sample_date: ordered[ordered.len() - 1].sample_date,
                total_days,
                total_weight_gain_g: round_to(total_gain, 2),
                avg_daily_growth_g: if total_days > 0 {
                    Some(round_to(total_gain / total_days as f64, 2))
                } else {
                    None
                },
                avg_sgr_pct: if sgrs.is_empty() {
                    None
                } else {
                    Some(round_to(sgrs.iter().sum::<f64>() / sgrs.len() as f64, 2))
                },
                min_weight_g,
                max_weight_g,
                avg_condition_factor,
            })
        } else {
            None
        };

        GrowthAnalysis {
            batch_id: batch_id.to_string(),
            samples: points,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, date: (i32, u32, u32), weight: f64, length: Option<f64>) -> GrowthSample {
        GrowthSample {
            sample_id: id.to_string(),
            assignment_id: "A1".to_string(),
            sample_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            sample_size: 30,
            avg_weight_g: weight,
            avg_length_cm: length,
            std_deviation_weight: None,
            std_deviation_length: None,
            condition_factor: None,
            notes: None,
        }
    }

    #[test]
    fn test_sgr_requires_positive_days_and_weight() {
        assert!(GrowthAnalyticsEngine::specific_growth_rate(10.0, 20.0, 0).is_none());
        assert!(GrowthAnalyticsEngine::specific_growth_rate(0.0, 20.0, 5).is_none());
        let sgr = GrowthAnalyticsEngine::specific_growth_rate(10.0, 20.0, 10).unwrap();
        assert!((sgr - 6.931).abs() < 0.001);
    }

    #[test]
    fn test_analyze_series_sorted_and_summarized() {
        let engine = GrowthAnalyticsEngine::new();
        let samples = vec![
            sample("S3", (2026, 1, 21), 140.0, None),
            sample("S1", (2026, 1, 1), 100.0, Some(20.0)),
            sample("S2", (2026, 1, 11), 120.0, None),
        ];

        let analysis = engine.analyze("B1", &samples);
        let ids: Vec<&str> = analysis.samples.iter().map(|p| p.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);

        assert!(analysis.samples[0].sgr_pct.is_none());
        assert_eq!(analysis.samples[1].weight_gain_g, Some(20.0));
        assert_eq!(analysis.samples[1].daily_growth_g, Some(2.0));
        assert_eq!(analysis.samples[0].condition_factor, Some(1.25));

        let summary = analysis.summary.unwrap();
        assert_eq!(summary.total_weight_gain_g, 40.0);
        assert_eq!(summary.total_days, 20);
        assert_eq!(summary.avg_daily_growth_g, Some(2.0));
        assert_eq!(summary.min_weight_g, 100.0);
        assert_eq!(summary.max_weight_g, 140.0);
        // (ln1.2/10 + ln(140/120)/10)/2 × 100 ≈ 1.68
        assert_eq!(summary.avg_sgr_pct, Some(1.68));
        assert_eq!(summary.avg_condition_factor, Some(1.25));
    }

    #[test]
    fn test_same_day_samples_have_no_growth_fields() {
        let engine = GrowthAnalyticsEngine::new();
        let samples = vec![
            sample("S1", (2026, 2, 1), 50.0, None),
            sample("S2", (2026, 2, 1), 55.0, None),
        ];
        let analysis = engine.analyze("B1", &samples);
        let second = &analysis.samples[1];
        assert_eq!(second.days_since_previous, Some(0));
        assert!(second.sgr_pct.is_none());
        assert!(second.weight_gain_g.is_none());

        let summary = analysis.summary.unwrap();
        assert_eq!(summary.total_days, 0);
        assert!(summary.avg_daily_growth_g.is_none());
        assert!(summary.avg_sgr_pct.is_none());
    }

    #[test]
    fn test_single_sample_has_no_summary() {
        let engine = GrowthAnalyticsEngine::new();
        let analysis = engine.analyze("B1", &[sample("S1", (2026, 2, 1), 50.0, None)]);
        assert_eq!(analysis.samples.len(), 1);
        assert!(analysis.summary.is_none());
    }
}
