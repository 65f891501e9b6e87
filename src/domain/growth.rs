// ==========================================
// 养殖批次运营核心 - 生长抽样领域模型
// ==========================================
// 职责: 生长抽样记录, 肥满度 (K 值) 推导
// ==========================================

use crate::domain::batch::round_to;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// GrowthSample - 生长抽样
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSample {
    pub sample_id: String,
    pub assignment_id: String,
    pub sample_date: NaiveDate,
    pub sample_size: i32,
    pub avg_weight_g: f64,
    pub avg_length_cm: Option<f64>,
    pub std_deviation_weight: Option<f64>,
    pub std_deviation_length: Option<f64>,
    pub condition_factor: Option<f64>, // K = 100 × W / L³
    pub notes: Option<String>,
}

impl GrowthSample {
    /// 计算肥满度 K = 100 × weight_g / length_cm³
    ///
    /// 体重或体长缺失/非正时返回 None
    pub fn compute_condition_factor(avg_weight_g: f64, avg_length_cm: Option<f64>) -> Option<f64> {
        let length = avg_length_cm?;
        if avg_weight_g <= 0.0 || length <= 0.0 {
            return None;
        }
        Some(round_to(100.0 * avg_weight_g / length.powi(3), 2))
    }

    /// 按当前体重/体长刷新 K 值
    pub fn refresh_condition_factor(&mut self) {
        self.condition_factor = Self::compute_condition_factor(self.avg_weight_g, self.avg_length_cm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_factor() {
        // 100 × 200 / 25³ = 1.28
        assert_eq!(GrowthSample::compute_condition_factor(200.0, Some(25.0)), Some(1.28));
        assert_eq!(GrowthSample::compute_condition_factor(200.0, None), None);
        assert_eq!(GrowthSample::compute_condition_factor(0.0, Some(10.0)), None);
        assert_eq!(GrowthSample::compute_condition_factor(10.0, Some(0.0)), None);
    }
}
