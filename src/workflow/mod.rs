//! # QHA 工作流核心
//!
//! 预测 → 规划 → 展开 → 汇合 → 聚合 → 归约 的编排逻辑。
//!
//! ## 子模块
//! - `runner`: 引擎能力接口、任务句柄与结果存储
//! - `planner`: 应力采样规划
//! - `aggregate`: 结果聚合
//! - `orchestrator`: 状态机编排器
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 由 `backend/` 提供引擎与归约器实现
//! - 使用 `models/`, `error.rs`

pub mod aggregate;
pub mod orchestrator;
pub mod planner;
pub mod runner;

pub use orchestrator::{ProgressEvent, ProgressSink, QhaOrchestrator, QhaReducer, RunStage};
pub use runner::{PhononEngine, PhononJob, PredictionJob, ResultStore, TaskHandle};
