//! # 应力采样规划器
//!
//! 由 Gruneisen 预测的应力区间展开 N 个等距应力采样点，
//! 并为每个采样点生成一份自包含的声子子任务描述。
//!
//! ## 采样策略
//! 区间 [lo, hi] 先向两侧各扩展半个区间宽度，
//! 再在 [lo - 0.5Δ, hi + 0.5Δ] 上取 N 个含端点的等距值。
//!
//! ## 依赖关系
//! - 被 `workflow/orchestrator.rs`, `commands/plan.rs` 使用
//! - 使用 `models/`, `error.rs`

use crate::error::{QhaError, Result};
use crate::models::{Crystal, GruneisenPrediction, QhaSettings};
use crate::workflow::runner::PhononJob;

/// 按预测区间展开 N 个应力采样值（升序）
///
/// 退化区间（Δ = 0）不做特殊处理，产生 N 个相同值。
pub fn stress_samples(range: (f64, f64), count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(QhaError::InvalidSampleCount(0));
    }

    let (lo, hi) = range;
    let delta = hi - lo;
    Ok(linspace(lo - 0.5 * delta, hi + 0.5 * delta, count))
}

/// 生成 N 个含两端点的等距值；N = 1 时取区间起点
fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }

    let span = stop - start;
    (0..count)
        .map(|i| start + span * (i as f64) / ((count - 1) as f64))
        .collect()
}

/// 将预测结果展开为完整的子任务列表
///
/// 列表在任何提交发生之前整体物化；序号 i 即列表下标，
/// 除应力与序号外所有样本携带相同的透传配置，弛豫恒开。
pub fn expand_jobs(
    prediction: &GruneisenPrediction,
    settings: &QhaSettings,
    structure: &Crystal,
) -> Result<Vec<PhononJob>> {
    let stresses = stress_samples(prediction.stress_range, settings.sample_count)?;

    Ok(stresses
        .into_iter()
        .enumerate()
        .map(|(index, stress)| PhononJob {
            index,
            stress,
            structure: structure.clone(),
            phonon: settings.phonon.clone(),
            electronic: settings.electronic.clone(),
            optimize: true,
            use_nac: settings.use_nac,
        })
        .collect())
}
