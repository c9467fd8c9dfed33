//! # phonopy-qha 归约器
//!
//! `QhaReducer` 的子进程实现：把聚合输入写回 phonopy-qha 可读的
//! e-v.dat 与 thermal_properties.yaml-NNN 文件，运行 phonopy-qha，
//! 再把它产出的全部 .dat 文件收获为命名数组。量名取文件主干名
//! （'-' 归一为 '_'），核心不解释具体含义。
//!
//! ## 依赖关系
//! - 实现 `workflow/orchestrator.rs` 的 `QhaReducer`
//! - 使用 `parsers/dat.rs`
//! - 使用 `tokio::process` 运行 phonopy-qha

use crate::error::{QhaError, Result};
use crate::models::{QhaInput, QhaResult};
use crate::parsers::dat;
use crate::workflow::orchestrator::QhaReducer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// phonopy-qha 子进程归约器
pub struct QhaToolReducer {
    /// phonopy-qha 命令
    command: String,

    /// 归约工作目录
    workdir: PathBuf,
}

impl QhaToolReducer {
    pub fn new(command: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        QhaToolReducer {
            command: command.into(),
            workdir: workdir.into(),
        }
    }
}

/// 渲染 e-v.dat：每个样本一行，体积与能量两列
fn render_ev_dat(input: &QhaInput) -> String {
    let mut out = String::from("#   cell volume        energy of cell\n");
    for (volume, energy) in input.volumes.iter().zip(input.energies.iter()) {
        out.push_str(&format!("{:20.10} {:20.10}\n", volume, energy));
    }
    out
}

/// 渲染第 `sample` 个样本的 thermal_properties.yaml
///
/// 聚合输入是温度主序矩阵，这里按样本切回 phonopy 布局。
fn render_thermal_yaml(input: &QhaInput, sample: usize) -> String {
    let mut out = String::from("thermal_properties:\n");
    for (t_idx, temperature) in input.temperatures.iter().enumerate() {
        out.push_str(&format!("- temperature: {:20.10}\n", temperature));
        out.push_str(&format!(
            "  free_energy: {:20.10}\n",
            input.free_energy[t_idx][sample]
        ));
        out.push_str(&format!(
            "  entropy:     {:20.10}\n",
            input.entropy[t_idx][sample]
        ));
        out.push_str(&format!(
            "  heat_capacity: {:18.10}\n",
            input.heat_capacity[t_idx][sample]
        ));
    }
    out
}

/// 量名：文件主干名，'-' 归一为 '_'
fn quantity_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace('-', "_"))
}

async fn write_file(path: &Path, content: String) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| QhaError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
}

#[async_trait]
impl QhaReducer for QhaToolReducer {
    async fn reduce(&self, input: &QhaInput) -> Result<QhaResult> {
        let dir = self.workdir.join("qha");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| QhaError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })?;

        // 写入 phonopy-qha 的输入文件
        write_file(&dir.join("e-v.dat"), render_ev_dat(input)).await?;

        let mut args = vec!["e-v.dat".to_string()];
        for sample in 0..input.sample_count() {
            let name = format!("thermal_properties.yaml-{:03}", sample);
            write_file(&dir.join(&name), render_thermal_yaml(input, sample)).await?;
            args.push(name);
        }

        let output = Command::new(&self.command)
            .args(&args)
            .current_dir(&dir)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    QhaError::CommandNotFound {
                        command: self.command.clone(),
                    }
                } else {
                    QhaError::ReductionFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(QhaError::ReductionFailed {
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        // 收获全部 .dat 产物；量名集合由 phonopy-qha 决定，原样透传
        let mut result = QhaResult::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| QhaError::FileReadError {
                path: dir.display().to_string(),
                source: e,
            })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| QhaError::FileReadError {
                path: dir.display().to_string(),
                source: e,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("dat") {
                continue;
            }
            let name = match quantity_name(&path) {
                Some(name) => name,
                None => continue,
            };
            if name == "e_v" {
                continue; // 自己写入的输入文件
            }

            let rows = dat::parse_two_column(&path)?;
            if result.get("temperature").is_none() {
                result.insert("temperature", rows.iter().map(|(x, _)| *x).collect());
            }
            result.insert(name, rows.iter().map(|(_, y)| *y).collect());
        }

        if result.is_empty() {
            return Err(QhaError::ReductionFailed {
                reason: format!("'{}' produced no .dat output", self.command),
            });
        }

        Ok(result)
    }
}
