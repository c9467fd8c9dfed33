//! # QHA 结果导出
//!
//! 把发布的全部命名数组写入一张宽表 CSV：列为量名（字典序），
//! 行按下标对齐，较短的数组尾部留空。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `models/thermal.rs` 的 QhaResult
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{QhaError, Result};
use crate::models::QhaResult;
use std::path::Path;

/// 导出 QHA 结果为 CSV 格式
pub fn results_to_csv(result: &QhaResult, output_path: &Path) -> Result<()> {
    let names: Vec<&str> = result.names().collect();
    if names.is_empty() {
        return std::fs::write(output_path, "").map_err(|e| QhaError::FileWriteError {
            path: output_path.display().to_string(),
            source: e,
        });
    }

    let mut wtr = csv::Writer::from_path(output_path).map_err(QhaError::CsvError)?;
    wtr.write_record(&names).map_err(QhaError::CsvError)?;

    let rows = names
        .iter()
        .filter_map(|name| result.get(name))
        .map(|values| values.len())
        .max()
        .unwrap_or(0);

    for row in 0..rows {
        let record: Vec<String> = names
            .iter()
            .map(|name| {
                result
                    .get(name)
                    .and_then(|values| values.get(row))
                    .map(|v| format!("{:.8}", v))
                    .unwrap_or_default()
            })
            .collect();
        wtr.write_record(&record).map_err(QhaError::CsvError)?;
    }

    wtr.flush().map_err(|e| QhaError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
