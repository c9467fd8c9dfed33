//! # plan 命令实现
//!
//! 不运行任何计算，只把给定应力区间展开为采样表打印出来，
//! 便于在提交长时间作业前检查采样方案。
//!
//! ## 依赖关系
//! - 使用 `cli/plan.rs` 定义的参数
//! - 使用 `workflow/planner.rs`
//! - 使用 `utils/output.rs`

use crate::cli::plan::PlanArgs;
use crate::error::{QhaError, Result};
use crate::utils::output;
use crate::workflow::planner;

use tabled::{Table, Tabled};

/// 采样表行
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Stress (GPa)")]
    stress: String,
}

/// 执行 plan 命令
pub fn execute(args: PlanArgs) -> Result<()> {
    output::print_header("Stress Sampling Plan");

    if args.stress_max < args.stress_min {
        return Err(QhaError::InvalidArgument(format!(
            "stress range is not ordered: [{}, {}]",
            args.stress_min, args.stress_max
        )));
    }

    let range = (args.stress_min, args.stress_max);
    let samples = planner::stress_samples(range, args.samples)?;

    let delta = args.stress_max - args.stress_min;
    output::print_info(&format!(
        "Predicted range [{}, {}] GPa expands to [{}, {}] GPa",
        args.stress_min,
        args.stress_max,
        args.stress_min - 0.5 * delta,
        args.stress_max + 0.5 * delta
    ));

    let rows: Vec<PlanRow> = samples
        .iter()
        .enumerate()
        .map(|(index, stress)| PlanRow {
            index,
            stress: format!("{:.4}", stress),
        })
        .collect();

    println!("{}", Table::new(rows));
    output::print_done(&format!("{} samples planned", samples.len()));

    Ok(())
}
