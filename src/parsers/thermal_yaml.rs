//! # phonopy thermal_properties.yaml 解析器
//!
//! 按行提取温度、自由能、熵与热容四列，装配为热力学性质表。
//! 只依赖 phonopy 输出的固定缩进布局，不做完整 YAML 解析。
//!
//! ## 文件片段示例
//! ```text
//! thermal_properties:
//! - temperature:         0.0000000
//!   free_energy:         5.1342451
//!   entropy:             0.0000000
//!   heat_capacity:       0.0000000
//! ```
//!
//! ## 依赖关系
//! - 被 `backend/driver.rs` 使用
//! - 使用 `models/thermal.rs`

use crate::error::{QhaError, Result};
use crate::models::ThermalTable;
use std::fs;
use std::path::Path;

/// 解析 thermal_properties.yaml 文件
pub fn parse_thermal_file(path: &Path) -> Result<ThermalTable> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_thermal_content(&content, &path.display().to_string())
}

/// 从字符串内容解析热力学性质表
pub fn parse_thermal_content(content: &str, source: &str) -> Result<ThermalTable> {
    let mut temperatures = Vec::new();
    let mut free_energy = Vec::new();
    let mut entropy = Vec::new();
    let mut heat_capacity = Vec::new();

    // 文件头的 unit 块含同名键（"free_energy: kJ/mol"），
    // 只在 thermal_properties: 之后开始收集
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed == "thermal_properties:" {
            in_block = true;
            continue;
        }
        if !in_block {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("- temperature:") {
            push_value(&mut temperatures, rest, source, "temperature")?;
        } else if let Some(rest) = trimmed.strip_prefix("free_energy:") {
            push_value(&mut free_energy, rest, source, "free_energy")?;
        } else if let Some(rest) = trimmed.strip_prefix("entropy:") {
            push_value(&mut entropy, rest, source, "entropy")?;
        } else if let Some(rest) = trimmed.strip_prefix("heat_capacity:") {
            push_value(&mut heat_capacity, rest, source, "heat_capacity")?;
        }
    }

    let table = ThermalTable {
        temperatures,
        entropy,
        free_energy,
        heat_capacity,
    };

    if let Err(reason) = table.validate() {
        return Err(QhaError::ParseError {
            format: "thermal_properties".to_string(),
            path: source.to_string(),
            reason,
        });
    }

    Ok(table)
}

fn push_value(column: &mut Vec<f64>, raw: &str, source: &str, field: &str) -> Result<()> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| QhaError::ParseError {
            format: "thermal_properties".to_string(),
            path: source.to_string(),
            reason: format!("Invalid {} value: '{}'", field, raw.trim()),
        })?;
    column.push(value);
    Ok(())
}
