//! # 外部计算后端模块
//!
//! 工作流核心两个外部协作者的子进程实现：
//! 声子引擎调用用户驱动命令，归约器调用 phonopy-qha。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 实现 `workflow/` 定义的能力接口
//! - 子模块: conf, driver, qha_tool

pub mod conf;
pub mod driver;
pub mod qha_tool;

pub use driver::DriverEngine;
pub use qha_tool::QhaToolReducer;
