//! # 两列 .dat 数据解析器
//!
//! phonopy 系工具的 .dat 输出是以 # 开头注释、空白分隔的两列数值。
//! 预测阶段的 stress_range.dat 与 phonopy-qha 的全部输出都走这里。
//!
//! ## 依赖关系
//! - 被 `backend/driver.rs`, `backend/qha_tool.rs` 使用
//! - 使用 `error.rs`

use crate::error::{QhaError, Result};
use std::fs;
use std::path::Path;

/// 解析两列数值文件；注释行与空行被跳过
pub fn parse_two_column(path: &Path) -> Result<Vec<(f64, f64)>> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let x = fields.next().and_then(|s| s.parse::<f64>().ok());
        let y = fields.next().and_then(|s| s.parse::<f64>().ok());
        match (x, y) {
            (Some(x), Some(y)) => rows.push((x, y)),
            _ => {
                return Err(QhaError::ParseError {
                    format: "dat".to_string(),
                    path: path.display().to_string(),
                    reason: format!("Expected two numeric columns at line {}", line_no + 1),
                });
            }
        }
    }

    if rows.is_empty() {
        return Err(QhaError::ParseError {
            format: "dat".to_string(),
            path: path.display().to_string(),
            reason: "No data rows found".to_string(),
        });
    }

    Ok(rows)
}
