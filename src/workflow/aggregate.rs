//! # 结果聚合器
//!
//! 将按序号排列的 N 个声子结果按列抽取为 QHA 输入：
//! 体积、能量、应力各一列，热力学三矩阵转置为温度主序。
//!
//! ## 依赖关系
//! - 被 `workflow/orchestrator.rs` 使用
//! - 使用 `models/`, `error.rs`

use crate::error::{QhaError, Result};
use crate::models::{PhononOutput, QhaInput};

/// 聚合 N 个声子结果为 QHA 输入
///
/// 输入必须已按采样序号升序排列；温度轴取自首个结果，
/// 其余结果逐一做精确相等校验（长度与数值），不一致即硬错误。
pub fn collect_qha_input(results: &[PhononOutput]) -> Result<QhaInput> {
    let first = results.first().ok_or_else(|| QhaError::MalformedResult {
        index: 0,
        reason: "empty result set".to_string(),
    })?;

    for (index, result) in results.iter().enumerate() {
        if let Err(reason) = result.thermal.validate() {
            return Err(QhaError::MalformedResult { index, reason });
        }
    }

    let axis = &first.thermal.temperatures;
    for (index, result) in results.iter().enumerate().skip(1) {
        if result.thermal.temperatures != *axis {
            return Err(QhaError::TemperatureAxisMismatch { index });
        }
    }

    Ok(QhaInput {
        volumes: results.iter().map(|r| r.volume()).collect(),
        energies: results.iter().map(|r| r.energy).collect(),
        stresses: results.iter().map(|r| r.stress_average()).collect(),
        temperatures: axis.clone(),
        free_energy: transpose(results, |r| &r.thermal.free_energy),
        entropy: transpose(results, |r| &r.thermal.entropy),
        heat_capacity: transpose(results, |r| &r.thermal.heat_capacity),
    })
}

/// 样本主序转温度主序：结果形状 (T × N)
fn transpose<'a, F>(results: &'a [PhononOutput], column: F) -> Vec<Vec<f64>>
where
    F: Fn(&'a PhononOutput) -> &'a Vec<f64>,
{
    let points = results.first().map(|r| column(r).len()).unwrap_or(0);
    (0..points)
        .map(|t| results.iter().map(|r| column(r)[t]).collect())
        .collect()
}
