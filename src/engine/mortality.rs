// ==========================================
// 养殖批次运营核心 - 死亡汇总引擎
// ==========================================
// 职责: 死亡数量/生物量汇总, 死亡率, 按原因分布
// 口径: initial_population = 当前存栏 + 全部累计死亡 (不随日期过滤变化)
//       死亡率分子取过滤区间内死亡数
// ==========================================

use crate::domain::batch::round_to;
use crate::domain::mortality::MortalityEvent;
use crate::domain::types::MortalityCause;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 按原因分布
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityCauseBreakdown {
    pub cause: MortalityCause,
    pub count: i64,
    pub biomass_kg: f64,
    pub percentage: f64,
}

/// 批次死亡汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalitySummary {
    pub batch_id: String,
    pub event_count: usize,
    pub total_count: i64,
    pub total_biomass_kg: f64,
    pub current_population: i64,
    pub initial_population: i64,
    pub mortality_rate_pct: f64,
    pub by_cause: Vec<MortalityCauseBreakdown>,
}

// ==========================================
// MortalityAggregator - 死亡汇总引擎
// ==========================================
pub struct MortalityAggregator {
    // 无状态引擎
}

impl Default for MortalityAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MortalityAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 死亡率 (%), 保留 2 位小数
    pub fn mortality_rate(total_count: i64, initial_population: i64) -> f64 {
        if initial_population <= 0 {
            return 0.0;
        }
        let rate = total_count as f64 / initial_population as f64 * 100.0;
        round_to(rate.clamp(0.0, 100.0), 2)
    }

    /// 汇总批次死亡事件
    ///
    /// # 参数
    /// - `current_population`: 批次当前在养数量 (活跃分配之和)
    /// - `date_range`: 可选日期过滤 (闭区间)
    pub fn summarize(
        &self,
        batch_id: &str,
        events: &[MortalityEvent],
        current_population: i64,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> MortalitySummary {
        let in_range = |e: &&MortalityEvent| match date_range {
            Some((start, end)) => e.event_date >= start && e.event_date <= end,
            None => true,
        };
        let filtered: Vec<&MortalityEvent> = events.iter().filter(in_range).collect();

        let total_count: i64 = filtered.iter().map(|e| e.count).sum();
        let total_biomass: f64 = filtered.iter().map(|e| e.biomass_kg).sum();
        let current_population = current_population.max(0);
        let lifetime_count: i64 = events.iter().map(|e| e.count).sum();
        let initial_population = current_population + lifetime_count;

        let mut grouped: HashMap<MortalityCause, (i64, f64)> = HashMap::new();
        for event in &filtered {
            let entry = grouped.entry(event.cause).or_insert((0, 0.0));
            entry.0 += event.count;
            entry.1 += event.biomass_kg;
        }

        let mut by_cause: Vec<MortalityCauseBreakdown> = grouped
            .into_iter()
            .map(|(cause, (count, biomass))| MortalityCauseBreakdown {
                cause,
                count,
                biomass_kg: round_to(biomass, 2),
                percentage: if total_count > 0 {
                    round_to(count as f64 / total_count as f64 * 100.0, 2)
                } else {
                    0.0
                },
            })
            .collect();
        // 数量降序, 同数量按原因稳定排序
        by_cause.sort_by(|a, b| b.count.cmp(&a.count).then(a.cause.cmp(&b.cause)));

        MortalitySummary {
            batch_id: batch_id.to_string(),
            event_count: filtered.len(),
            total_count,
            total_biomass_kg: round_to(total_biomass, 2),
            current_population,
            initial_population,
            mortality_rate_pct: Self::mortality_rate(total_count, initial_population),
            by_cause,
        }
    }

    /// 批次级死亡按在养数量比例分摊到各分配 (最大余数法)
    ///
    /// 份额之和等于 `count` (不超过总在养数量时), 每份不超过对应在养数量;
    /// 余数相同时靠前的分配优先
    pub fn allocate(populations: &[i64], count: i64) -> Vec<i64> {
        let total: i64 = populations.iter().map(|p| (*p).max(0)).sum();
        if total <= 0 || count <= 0 {
            return vec![0; populations.len()];
        }
        let count = count.min(total);

        let mut shares = Vec::with_capacity(populations.len());
        let mut remainders = Vec::with_capacity(populations.len());
        for (idx, population) in populations.iter().enumerate() {
            let scaled = (*population).max(0) as i128 * count as i128;
            shares.push((scaled / total as i128) as i64);
            remainders.push((scaled % total as i128, idx));
        }

        let mut left = count - shares.iter().sum::<i64>();
        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, idx) in remainders {
            if left == 0 {
                break;
            }
            if shares[idx] < populations[idx] {
                shares[idx] += 1;
                left -= 1;
            }
        }
        shares
    }
}
