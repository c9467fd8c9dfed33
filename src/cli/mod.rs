//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `run`: 运行完整 QHA 工作流
//! - `plan`: 预览给定应力区间的采样方案
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, plan

pub mod plan;
pub mod run;

use clap::{Parser, Subcommand};

/// qhaflow - 准简谐近似工作流编排器
#[derive(Parser)]
#[command(name = "qhaflow")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "A quasi-harmonic approximation workflow orchestrator for phonon calculations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run the full QHA workflow for a structure
    Run(run::RunArgs),

    /// Preview the expanded stress sampling plan for a stress range
    Plan(plan::PlanArgs),
}
