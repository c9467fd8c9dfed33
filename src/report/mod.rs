//! # 结果报告模块
//!
//! 发布结果的 CSV 导出与图表生成。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 使用 `models/thermal.rs`
//! - 子模块: export, plot

pub mod export;
pub mod plot;
