//! # VASP OUTCAR 解析器
//!
//! 从驱动留下的 OUTCAR 中提取最终能量与应力张量，
//! 供声子子任务的结果装配使用。
//!
//! ## 依赖关系
//! - 被 `backend/driver.rs` 使用
//! - 使用 `error.rs`

use crate::error::{QhaError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 弛豫计算的摘要信息
#[derive(Debug, Clone)]
pub struct RelaxSummary {
    /// 最终总能量 (eV)
    pub energy_ev: f64,

    /// 应力张量 (GPa)
    pub stress_gpa: [[f64; 3]; 3],
}

/// 解析 VASP OUTCAR 文件
///
/// 能量与应力都取文件中最后一次出现的值（离子步迭代的终值）。
pub fn parse_outcar(path: &Path) -> Result<RelaxSummary> {
    let file = File::open(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    let mut energy: Option<f64> = None;
    let mut stress: Option<[[f64; 3]; 3]> = None;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        // 提取能量
        // "energy  without entropy=     -123.456789  energy(sigma->0) =     -123.456789"
        if line.contains("energy  without entropy") {
            if let Some(pos) = line.find("energy(sigma->0)") {
                if let Some(val) = extract_number_after(&line[pos..], "=") {
                    energy = Some(val);
                }
            }
        }

        // 提取应力张量（Voigt 顺序 XX YY ZZ XY YZ ZX，单位 kB）
        // "  in kB     -56.24   -56.24   -56.24     0.00     0.00     0.00"
        if line.contains("in kB") {
            let values: Vec<f64> = line
                .split_whitespace()
                .filter_map(|w| w.parse::<f64>().ok())
                .collect();
            if values.len() >= 6 {
                stress = Some(voigt_to_tensor(&values));
            }
        }
    }

    let energy_ev = energy.ok_or_else(|| parse_error(path, "No final energy found"))?;
    let stress_gpa = stress.ok_or_else(|| parse_error(path, "No stress tensor found"))?;

    Ok(RelaxSummary {
        energy_ev,
        stress_gpa,
    })
}

/// Voigt 六分量 (kB) 转对称张量 (GPa)；1 GPa = 10 kB
fn voigt_to_tensor(v: &[f64]) -> [[f64; 3]; 3] {
    let (xx, yy, zz) = (v[0] / 10.0, v[1] / 10.0, v[2] / 10.0);
    let (xy, yz, zx) = (v[3] / 10.0, v[4] / 10.0, v[5] / 10.0);
    [[xx, xy, zx], [xy, yy, yz], [zx, yz, zz]]
}

/// 从字符串中提取指定标记之后的数字
fn extract_number_after(s: &str, marker: &str) -> Option<f64> {
    let pos = s.find(marker)?;
    let after = &s[pos + marker.len()..];
    after.trim().split_whitespace().next()?.parse().ok()
}

fn parse_error(path: &Path, reason: &str) -> QhaError {
    QhaError::ParseError {
        format: "outcar".to_string(),
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
