//! # qhaflow - 准简谐近似工作流编排器
//!
//! 对一个晶体结构运行完整的 QHA 流水线：先做一次 Gruneisen
//! 预测，由预测的应力区间展开 N 个声子子计算并发执行，
//! 全部完成后聚合为 QHA 输入，交给外部归约程序发布结果。
//!
//! ## 子命令
//! - `run`  - 运行完整 QHA 工作流
//! - `plan` - 预览应力采样方案
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── workflow/  (编排器、规划器、聚合器)
//!   │     ├── backend/   (驱动引擎与 phonopy-qha 归约器)
//!   │     ├── parsers/   (POSCAR/OUTCAR/热力学输出解析)
//!   │     ├── models/    (数据模型)
//!   │     └── report/    (CSV 导出与绘图)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod backend;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod report;
mod utils;
mod workflow;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command).await {
        utils::output::print_error(&format!("{}", e));
        if let Some(stage) = e.stage() {
            utils::output::print_info(&format!("Run failed during the '{}' stage", stage));
        }
        std::process::exit(1);
    }
}
