//! # plan 子命令 CLI 定义
//!
//! 预览应力采样方案的参数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plan.rs`

use clap::Args;

/// plan 子命令参数
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Lower bound of the predicted stress range (GPa)
    #[arg(long, allow_hyphen_values = true)]
    pub stress_min: f64,

    /// Upper bound of the predicted stress range (GPa)
    #[arg(long, allow_hyphen_values = true)]
    pub stress_max: f64,

    /// Number of stress samples across the expanded range
    #[arg(long, default_value_t = 10)]
    pub samples: usize,
}
