// ==========================================
// 养殖批次运营核心 - FCR 趋势引擎
// ==========================================
// 职责: 按时间桶 (日/周/月) × 聚合层级 (批次/分配/地域) 计算饵料系数
// 输入: 投喂观测 + 增重观测 + 情景模型预测
// 输出: FcrTrends (实际 FCR / 预测 FCR / 偏差 / 置信度)
// ==========================================

use crate::domain::batch::round_to;
use crate::domain::growth::GrowthSample;
use crate::domain::scenario::ScenarioProjection;
use crate::domain::types::{AggregationLevel, ConfidenceLevel, TimeInterval};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// 输入观测
// ==========================================

/// 投喂观测 (一次投喂事件)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedObservation {
    pub date: NaiveDate,
    pub batch_id: String,
    pub assignment_id: String,
    pub geography_id: String,
    pub feed_kg: f64,
}

/// 增重观测 (相邻两次抽样之间的生物量增量, 记在后一次抽样日期)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainObservation {
    pub date: NaiveDate,
    pub batch_id: String,
    pub assignment_id: String,
    pub geography_id: String,
    pub biomass_gain_kg: f64,
}

/// 情景模型日预测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedObservation {
    pub date: NaiveDate,
    pub batch_id: String,
    pub feed_kg: f64,
    pub expected_gain_kg: f64,
}

/// 增重推导所需的分配上下文
#[derive(Debug, Clone)]
pub struct AssignmentContext {
    pub assignment_id: String,
    pub batch_id: String,
    pub geography_id: String,
    pub population_count: i64,
}

// ==========================================
// 查询与默认值
// ==========================================

/// FCR 趋势查询 (未指定字段走默认值)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FcrTrendsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub interval: Option<TimeInterval>,
    pub aggregation_level: Option<AggregationLevel>,
    pub batch_id: Option<String>,
    pub assignment_id: Option<String>,
    pub geography_id: Option<String>,
}

/// 默认值 (来自配置)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FcrQueryDefaults {
    pub interval: TimeInterval,
    pub aggregation_level: AggregationLevel,
    pub lookback_days: i64,
}

impl Default for FcrQueryDefaults {
    fn default() -> Self {
        Self {
            interval: TimeInterval::Daily,
            aggregation_level: AggregationLevel::Geography,
            lookback_days: 365,
        }
    }
}

/// 解析后的查询
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFcrQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval: TimeInterval,
    pub aggregation_level: AggregationLevel,
}

impl FcrTrendsQuery {
    /// 填充默认值: end = today, start = end - lookback
    ///
    /// # 错误
    /// start_date > end_date 返回错误原因
    pub fn resolve(&self, today: NaiveDate, defaults: &FcrQueryDefaults) -> Result<ResolvedFcrQuery, String> {
        let end_date = self.end_date.unwrap_or(today);
        let start_date = self
            .start_date
            .unwrap_or_else(|| end_date - Duration::days(defaults.lookback_days));

        if start_date > end_date {
            return Err(format!(
                "start_date ({}) 不能晚于 end_date ({})",
                start_date, end_date
            ));
        }

        Ok(ResolvedFcrQuery {
            start_date,
            end_date,
            interval: self.interval.unwrap_or(defaults.interval),
            aggregation_level: self.aggregation_level.unwrap_or(defaults.aggregation_level),
        })
    }
}

/// 置信度阈值 (按桶内抽样次数)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub very_high_min_samples: usize,
    pub high_min_samples: usize,
    pub medium_min_samples: usize,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            very_high_min_samples: 10,
            high_min_samples: 5,
            medium_min_samples: 2,
        }
    }
}

impl ConfidenceThresholds {
    pub fn classify(&self, sample_count: usize) -> ConfidenceLevel {
        if sample_count >= self.very_high_min_samples {
            ConfidenceLevel::VeryHigh
        } else if sample_count >= self.high_min_samples {
            ConfidenceLevel::High
        } else if sample_count >= self.medium_min_samples {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

// ==========================================
// 输出
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrTrendPoint {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub feed_kg: f64,
    pub biomass_gain_kg: f64,
    pub actual_fcr: Option<f64>,
    pub predicted_fcr: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub confidence: ConfidenceLevel,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrSeries {
    pub entity_id: String,
    pub points: Vec<FcrTrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrTrends {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval: TimeInterval,
    pub aggregation_level: AggregationLevel,
    pub series: Vec<FcrSeries>,
}

// ==========================================
// 时间桶
// ==========================================

/// 日期所在桶的起始日
pub fn bucket_start(date: NaiveDate, interval: TimeInterval) -> NaiveDate {
    match interval {
        TimeInterval::Daily => date,
        TimeInterval::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        TimeInterval::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// 桶的结束日 (含)
pub fn bucket_end(start: NaiveDate, interval: TimeInterval) -> NaiveDate {
    match interval {
        TimeInterval::Daily => start,
        TimeInterval::Weekly => start + Duration::days(6),
        TimeInterval::Monthly => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
                .map(|next| next - Duration::days(1))
                .unwrap_or(start)
        }
    }
}

/// 实际/预测 FCR = 饲料 / 增重 (增重 ≤ 0 或无饲料时无值)
pub fn feed_conversion_ratio(feed_kg: f64, gain_kg: f64) -> Option<f64> {
    raw_ratio(feed_kg, gain_kg).map(|ratio| round_to(ratio, 3))
}

/// 未舍入的 FCR, 偏差计算使用
fn raw_ratio(feed_kg: f64, gain_kg: f64) -> Option<f64> {
    if gain_kg <= 0.0 || feed_kg <= 0.0 {
        return None;
    }
    Some(feed_kg / gain_kg)
}

/// 偏差 (%) = (实际 - 预测) / 预测 × 100
pub fn deviation_pct(actual: Option<f64>, predicted: Option<f64>) -> Option<f64> {
    match (actual, predicted) {
        (Some(a), Some(p)) if p != 0.0 => Some(round_to((a - p) / p * 100.0, 2)),
        _ => None,
    }
}

// ==========================================
// 观测推导
// ==========================================

/// 由同一分配的生长抽样推导增重观测
///
/// gain_kg = (w_t - w_{t-1}) × population / 1000, 记在 t 日
pub fn biomass_gains_from_samples(ctx: &AssignmentContext, samples: &[GrowthSample]) -> Vec<GainObservation> {
    let mut ordered: Vec<&GrowthSample> = samples
        .iter()
        .filter(|s| s.assignment_id == ctx.assignment_id)
        .collect();
    ordered.sort_by_key(|s| s.sample_date);

    ordered
        .windows(2)
        .filter(|w| w[1].sample_date > w[0].sample_date)
        .map(|w| GainObservation {
            date: w[1].sample_date,
            batch_id: ctx.batch_id.clone(),
            assignment_id: ctx.assignment_id.clone(),
            geography_id: ctx.geography_id.clone(),
            biomass_gain_kg: (w[1].avg_weight_g - w[0].avg_weight_g) * ctx.population_count as f64
                / 1000.0,
        })
        .collect()
}

/// 由情景模型投影推导日预测 (首日无前值, 跳过)
pub fn predictions_from_projections(batch_id: &str, projections: &[ScenarioProjection]) -> Vec<PredictedObservation> {
    let mut ordered: Vec<&ScenarioProjection> = projections.iter().collect();
    ordered.sort_by_key(|p| p.projection_date);

    ordered
        .windows(2)
        .filter(|w| w[1].projection_date > w[0].projection_date)
        .map(|w| PredictedObservation {
            date: w[1].projection_date,
            batch_id: batch_id.to_string(),
            feed_kg: w[1].daily_feed_kg,
            expected_gain_kg: w[1].biomass_kg - w[0].biomass_kg,
        })
        .collect()
}

// ==========================================
// FcrTrendsEngine - FCR 趋势引擎
// ==========================================
pub struct FcrTrendsEngine {
    thresholds: ConfidenceThresholds,
}

#[derive(Default)]
struct BucketAccumulator {
    feed_kg: f64,
    gain_kg: f64,
    sample_count: usize,
}

impl Default for FcrTrendsEngine {
    fn default() -> Self {
        Self::new(ConfidenceThresholds::default())
    }
}

impl FcrTrendsEngine {
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self { thresholds }
    }

    fn entity_key<'a>(level: AggregationLevel, batch_id: &'a str, assignment_id: &'a str, geography_id: &'a str) -> &'a str {
        match level {
            AggregationLevel::Batch => batch_id,
            AggregationLevel::Assignment => assignment_id,
            AggregationLevel::Geography => geography_id,
        }
    }

    /// 计算 FCR 趋势
    pub fn compute(
        &self,
        query: &ResolvedFcrQuery,
        feed: &[FeedObservation],
        gains: &[GainObservation],
        predictions: &[PredictedObservation],
    ) -> FcrTrends {
        let in_range = |d: NaiveDate| d >= query.start_date && d <= query.end_date;
        let level = query.aggregation_level;
        let interval = query.interval;

        // (实体, 桶起始) -> 累计
        let mut actual: BTreeMap<(String, NaiveDate), BucketAccumulator> = BTreeMap::new();
        // 实体 -> 涉及批次 (预测按批次匹配)
        let mut entity_batches: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for obs in feed.iter().filter(|o| in_range(o.date)) {
            let key = Self::entity_key(level, &obs.batch_id, &obs.assignment_id, &obs.geography_id).to_string();
            entity_batches.entry(key.clone()).or_default().insert(obs.batch_id.clone());
            actual
                .entry((key, bucket_start(obs.date, interval)))
                .or_default()
                .feed_kg += obs.feed_kg;
        }

        for obs in gains.iter().filter(|o| in_range(o.date)) {
            let key = Self::entity_key(level, &obs.batch_id, &obs.assignment_id, &obs.geography_id).to_string();
            entity_batches.entry(key.clone()).or_default().insert(obs.batch_id.clone());
            let acc = actual.entry((key, bucket_start(obs.date, interval))).or_default();
            acc.gain_kg += obs.biomass_gain_kg;
            acc.sample_count += 1;
        }

        // 批次 -> 桶起始 -> (预测饲料, 预测增重)
        let mut predicted_by_batch: BTreeMap<(String, NaiveDate), (f64, f64)> = BTreeMap::new();
        for obs in predictions.iter().filter(|o| in_range(o.date)) {
            let entry = predicted_by_batch
                .entry((obs.batch_id.clone(), bucket_start(obs.date, interval)))
                .or_insert((0.0, 0.0));
            entry.0 += obs.feed_kg;
            entry.1 += obs.expected_gain_kg;
        }

        // 仅有预测的桶同样输出, 实际值为空
        let mut buckets: BTreeSet<(String, NaiveDate)> = actual.keys().cloned().collect();
        for (batch_id, start) in predicted_by_batch.keys() {
            match level {
                AggregationLevel::Batch => {
                    entity_batches.entry(batch_id.clone()).or_default().insert(batch_id.clone());
                    buckets.insert((batch_id.clone(), *start));
                }
                // 分配/地域仅能经实际观测关联到批次
                AggregationLevel::Assignment | AggregationLevel::Geography => {
                    for (entity, batches) in &entity_batches {
                        if batches.contains(batch_id) {
                            buckets.insert((entity.clone(), *start));
                        }
                    }
                }
            }
        }

        let mut series: BTreeMap<String, Vec<FcrTrendPoint>> = BTreeMap::new();
        for key in buckets {
            let acc = actual.remove(&key).unwrap_or_default();
            let (entity, start) = key;
            let (pred_feed, pred_gain) = entity_batches
                .get(&entity)
                .map(|batches| {
                    batches.iter().fold((0.0, 0.0), |sum, batch_id| {
                        match predicted_by_batch.get(&(batch_id.clone(), start)) {
                            Some((f, g)) => (sum.0 + f, sum.1 + g),
                            None => sum,
                        }
                    })
                })
                .unwrap_or((0.0, 0.0));

            let actual_raw = raw_ratio(acc.feed_kg, acc.gain_kg);
            let predicted_raw = raw_ratio(pred_feed, pred_gain);

            series.entry(entity).or_default().push(FcrTrendPoint {
                period_start: start,
                period_end: bucket_end(start, interval),
                feed_kg: round_to(acc.feed_kg, 2),
                biomass_gain_kg: round_to(acc.gain_kg, 2),
                actual_fcr: actual_raw.map(|r| round_to(r, 3)),
                predicted_fcr: predicted_raw.map(|r| round_to(r, 3)),
                deviation_pct: deviation_pct(actual_raw, predicted_raw),
                confidence: self.thresholds.classify(acc.sample_count),
                sample_count: acc.sample_count,
            });
        }

        FcrTrends {
            start_date: query.start_date,
            end_date: query.end_date,
            interval,
            aggregation_level: level,
            series: series
                .into_iter()
                .map(|(entity_id, points)| FcrSeries { entity_id, points })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn feed(date: NaiveDate, batch: &str, assignment: &str, geo: &str, kg: f64) -> FeedObservation {
        FeedObservation {
            date,
            batch_id: batch.to_string(),
            assignment_id: assignment.to_string(),
            geography_id: geo.to_string(),
            feed_kg: kg,
        }
    }

    fn gain(date: NaiveDate, batch: &str, assignment: &str, geo: &str, kg: f64) -> GainObservation {
        GainObservation {
            date,
            batch_id: batch.to_string(),
            assignment_id: assignment.to_string(),
            geography_id: geo.to_string(),
            biomass_gain_kg: kg,
        }
    }

    fn query(interval: TimeInterval, level: AggregationLevel) -> ResolvedFcrQuery {
        ResolvedFcrQuery {
            start_date: d(2026, 1, 1),
            end_date: d(2026, 3, 31),
            interval,
            aggregation_level: level,
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        // 2026-01-07 为周三
        assert_eq!(bucket_start(d(2026, 1, 7), TimeInterval::Weekly), d(2026, 1, 5));
        assert_eq!(bucket_end(d(2026, 1, 5), TimeInterval::Weekly), d(2026, 1, 11));
        assert_eq!(bucket_start(d(2026, 1, 11), TimeInterval::Weekly), d(2026, 1, 5));
        assert_eq!(bucket_start(d(2026, 2, 17), TimeInterval::Monthly), d(2026, 2, 1));
        assert_eq!(bucket_end(d(2026, 2, 1), TimeInterval::Monthly), d(2026, 2, 28));
        assert_eq!(bucket_end(d(2026, 12, 1), TimeInterval::Monthly), d(2026, 12, 31));
        assert_eq!(bucket_end(d(2026, 5, 9), TimeInterval::Daily), d(2026, 5, 9));
    }

    #[test]
    fn test_resolve_defaults() {
        let today = d(2026, 10, 14);
        let resolved = FcrTrendsQuery::default()
            .resolve(today, &FcrQueryDefaults::default())
            .unwrap();
        assert_eq!(resolved.end_date, today);
        assert_eq!(resolved.start_date, d(2025, 10, 14));
        assert_eq!(resolved.interval, TimeInterval::Daily);
        assert_eq!(resolved.aggregation_level, AggregationLevel::Geography);

        let bad = FcrTrendsQuery {
            start_date: Some(d(2026, 5, 1)),
            end_date: Some(d(2026, 4, 1)),
            ..Default::default()
        };
        assert!(bad.resolve(today, &FcrQueryDefaults::default()).is_err());
    }

    #[test]
    fn test_weekly_actual_and_predicted_with_deviation() {
        let engine = FcrTrendsEngine::default();
        let feed_obs = vec![
            feed(d(2026, 1, 5), "B1", "A1", "G1", 60.0),
            feed(d(2026, 1, 9), "B1", "A1", "G1", 60.0),
        ];
        let gain_obs = vec![gain(d(2026, 1, 11), "B1", "A1", "G1", 100.0)];
        let pred_obs = vec![
            PredictedObservation { date: d(2026, 1, 6), batch_id: "B1".to_string(), feed_kg: 50.0, expected_gain_kg: 50.0 },
            PredictedObservation { date: d(2026, 1, 7), batch_id: "B1".to_string(), feed_kg: 50.0, expected_gain_kg: 50.0 },
        ];

        let trends = engine.compute(
            &query(TimeInterval::Weekly, AggregationLevel::Geography),
            &feed_obs,
            &gain_obs,
            &pred_obs,
        );
        assert_eq!(trends.series.len(), 1);
        let series = &trends.series[0];
        assert_eq!(series.entity_id, "G1");
        assert_eq!(series.points.len(), 1);

        let point = &series.points[0];
        assert_eq!(point.period_start, d(2026, 1, 5));
        assert_eq!(point.period_end, d(2026, 1, 11));
        assert_eq!(point.actual_fcr, Some(1.2));
        assert_eq!(point.predicted_fcr, Some(1.0));
        assert_eq!(point.deviation_pct, Some(20.0));
        assert_eq!(point.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_missing_gain_or_prediction_leaves_fields_empty() {
        let engine = FcrTrendsEngine::default();
        let feed_obs = vec![feed(d(2026, 2, 3), "B1", "A1", "G1", 10.0)];
        let trends = engine.compute(
            &query(TimeInterval::Daily, AggregationLevel::Batch),
            &feed_obs,
            &[],
            &[],
        );
        let point = &trends.series[0].points[0];
        assert_eq!(trends.series[0].entity_id, "B1");
        assert!(point.actual_fcr.is_none());
        assert!(point.predicted_fcr.is_none());
        assert!(point.deviation_pct.is_none());
    }

    #[test]
    fn test_prediction_only_bucket_is_emitted() {
        let engine = FcrTrendsEngine::default();
        let feed_obs = vec![feed(d(2026, 1, 5), "B1", "A1", "G1", 10.0)];
        let pred_obs = vec![PredictedObservation {
            date: d(2026, 1, 6),
            batch_id: "B1".to_string(),
            feed_kg: 10.0,
            expected_gain_kg: 8.0,
        }];

        for level in [AggregationLevel::Batch, AggregationLevel::Geography] {
            let trends = engine.compute(&query(TimeInterval::Daily, level), &feed_obs, &[], &pred_obs);
            assert_eq!(trends.series.len(), 1);
            let points = &trends.series[0].points;
            assert_eq!(points.len(), 2);
            assert_eq!(points[0].period_start, d(2026, 1, 5));
            assert_eq!(points[0].feed_kg, 10.0);
            assert!(points[0].predicted_fcr.is_none());

            let predicted = &points[1];
            assert_eq!(predicted.period_start, d(2026, 1, 6));
            assert_eq!(predicted.predicted_fcr, Some(1.25));
            assert!(predicted.actual_fcr.is_none());
            assert!(predicted.deviation_pct.is_none());
            assert_eq!(predicted.feed_kg, 0.0);
            assert_eq!(predicted.sample_count, 0);
            assert_eq!(predicted.confidence, ConfidenceLevel::Low);
        }

        // 批次级: 无任何实际观测的批次也有预测序列
        let trends = engine.compute(&query(TimeInterval::Daily, AggregationLevel::Batch), &[], &[], &pred_obs);
        assert_eq!(trends.series[0].entity_id, "B1");
        assert_eq!(trends.series[0].points.len(), 1);
    }

    #[test]
    fn test_deviation_uses_unrounded_ratios() {
        let engine = FcrTrendsEngine::default();
        let feed_obs = vec![feed(d(2026, 1, 5), "B1", "A1", "G1", 33.349)];
        let gain_obs = vec![gain(d(2026, 1, 5), "B1", "A1", "G1", 100.0)];
        let pred_obs = vec![PredictedObservation {
            date: d(2026, 1, 5),
            batch_id: "B1".to_string(),
            feed_kg: 30.0,
            expected_gain_kg: 100.0,
        }];
        let trends = engine.compute(
            &query(TimeInterval::Daily, AggregationLevel::Batch),
            &feed_obs,
            &gain_obs,
            &pred_obs,
        );
        let point = &trends.series[0].points[0];
        assert_eq!(point.actual_fcr, Some(0.333));
        assert_eq!(point.predicted_fcr, Some(0.3));
        // 舍入后再算为 11.0
        assert_eq!(point.deviation_pct, Some(11.16));
    }

    #[test]
    fn test_assignment_level_keeps_series_apart_and_filters_range() {
        let engine = FcrTrendsEngine::default();
        let feed_obs = vec![
            feed(d(2026, 2, 3), "B1", "A1", "G1", 10.0),
            feed(d(2026, 2, 3), "B1", "A2", "G1", 30.0),
            feed(d(2025, 12, 31), "B1", "A1", "G1", 999.0),
        ];
        let gain_obs = vec![
            gain(d(2026, 2, 10), "B1", "A1", "G1", 10.0),
            gain(d(2026, 2, 12), "B1", "A2", "G1", 20.0),
        ];
        let trends = engine.compute(
            &query(TimeInterval::Monthly, AggregationLevel::Assignment),
            &feed_obs,
            &gain_obs,
            &[],
        );
        assert_eq!(trends.series.len(), 2);
        assert_eq!(trends.series[0].entity_id, "A1");
        assert_eq!(trends.series[0].points[0].actual_fcr, Some(1.0));
        assert_eq!(trends.series[1].points[0].actual_fcr, Some(1.5));
        assert_eq!(trends.series[0].points[0].feed_kg, 10.0);
    }

    #[test]
    fn test_confidence_thresholds() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.classify(0), ConfidenceLevel::Low);
        assert_eq!(t.classify(2), ConfidenceLevel::Medium);
        assert_eq!(t.classify(5), ConfidenceLevel::High);
        assert_eq!(t.classify(12), ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn test_gains_and_predictions_are_derived_from_consecutive_rows() {
        let ctx = AssignmentContext {
            assignment_id: "A1".to_string(),
            batch_id: "B1".to_string(),
            geography_id: "G1".to_string(),
            population_count: 10_000,
        };
        let mk = |id: &str, date: NaiveDate, w: f64| GrowthSample {
            sample_id: id.to_string(),
            assignment_id: "A1".to_string(),
            sample_date: date,
            sample_size: 20,
            avg_weight_g: w,
            avg_length_cm: None,
            std_deviation_weight: None,
            std_deviation_length: None,
            condition_factor: None,
            notes: None,
        };
        let gains = biomass_gains_from_samples(
            &ctx,
            &[mk("S2", d(2026, 1, 15), 60.0), mk("S1", d(2026, 1, 1), 50.0)],
        );
        assert_eq!(gains.len(), 1);
        assert_eq!(gains[0].date, d(2026, 1, 15));
        assert_eq!(gains[0].biomass_gain_kg, 100.0);

        let proj = |day: u32, biomass: f64, feed: f64| ScenarioProjection {
            scenario_id: "SC1".to_string(),
            projection_date: d(2026, 1, day),
            day_number: day as i32,
            average_weight_g: 0.0,
            population: 0.0,
            biomass_kg: biomass,
            daily_feed_kg: feed,
            cumulative_feed_kg: 0.0,
        };
        let preds = predictions_from_projections("B1", &[proj(1, 100.0, 5.0), proj(2, 104.0, 5.0)]);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].expected_gain_kg, 4.0);
        assert_eq!(preds[0].feed_kg, 5.0);
    }
}
