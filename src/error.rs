//! # 统一错误处理模块
//!
//! 定义 qhaflow 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qhaflow 统一错误类型
#[derive(Error, Debug)]
pub enum QhaError {
    // ─────────────────────────────────────────────────────────────
    // 配置错误（在任何子任务提交之前检测）
    // ─────────────────────────────────────────────────────────────
    #[error("Missing required settings: {0}")]
    MissingSettings(String),

    #[error("Invalid sample count: {0} (at least 1 stress sample is required)")]
    InvalidSampleCount(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 子任务错误
    // ─────────────────────────────────────────────────────────────
    #[error("Gruneisen prediction failed: {reason}")]
    PredictionFailed { reason: String },

    #[error("{}/{} phonon tasks failed: {}", .failed.len(), .total, format_failed(.failed))]
    PhononTasksFailed {
        total: usize,
        failed: Vec<(usize, String)>,
    },

    // ─────────────────────────────────────────────────────────────
    // 聚合错误
    // ─────────────────────────────────────────────────────────────
    #[error("Temperature axis of sample {index} does not match sample 0")]
    TemperatureAxisMismatch { index: usize },

    #[error("Malformed phonon result at sample {index}: {reason}")]
    MalformedResult { index: usize, reason: String },

    #[error("Result for sample {index} was already recorded")]
    DuplicateResult { index: usize },

    #[error("No result recorded for sample {index}")]
    MissingResult { index: usize },

    // ─────────────────────────────────────────────────────────────
    // 归约错误
    // ─────────────────────────────────────────────────────────────
    #[error("QHA reduction failed: {reason}")]
    ReductionFailed { reason: String },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl QhaError {
    /// 返回错误所属的工作流阶段（用于失败报告）
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            QhaError::MissingSettings(_)
            | QhaError::InvalidSampleCount(_)
            | QhaError::InvalidArgument(_) => Some("configuration"),
            QhaError::PredictionFailed { .. } => Some("predicting"),
            QhaError::PhononTasksFailed { .. } => Some("awaiting-all"),
            QhaError::TemperatureAxisMismatch { .. }
            | QhaError::MalformedResult { .. }
            | QhaError::DuplicateResult { .. }
            | QhaError::MissingResult { .. } => Some("aggregating"),
            QhaError::ReductionFailed { .. } => Some("reducing"),
            _ => None,
        }
    }
}

/// 拼接失败子任务的序号与原因
fn format_failed(failed: &[(usize, String)]) -> String {
    failed
        .iter()
        .map(|(index, reason)| format!("#{} ({})", index, reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QhaError>;
