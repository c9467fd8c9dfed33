//! # 解析器模块
//!
//! 提供结构文件与外部工具输出的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/`, `backend/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, outcar, thermal_yaml, dat

pub mod dat;
pub mod outcar;
pub mod poscar;
pub mod thermal_yaml;

use crate::error::{QhaError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析结构
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if name.starts_with("POSCAR") || name.starts_with("CONTCAR") {
            return poscar::parse_poscar_file(path);
        }
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "poscar" | "vasp" => poscar::parse_poscar_file(path),
        _ => Err(QhaError::UnsupportedFormat(format!(
            "Cannot determine format for: {}",
            path.display()
        ))),
    }
}
