//! # 外部驱动声子引擎
//!
//! `PhononEngine` 的子进程实现：为每个子任务准备作业目录
//! （POSCAR + phonopy.conf），调用用户驱动命令，结束后解析
//! 它留下的产物文件。并发进程数由信号量限制。
//!
//! ## 作业目录约定
//! ```text
//! <workdir>/gruneisen/        预测任务
//!     POSCAR  phonopy.conf  stress_range.dat
//! <workdir>/phonon_000/       第 i 个声子任务
//!     POSCAR  phonopy.conf  CONTCAR  OUTCAR  thermal_properties.yaml
//! ```
//!
//! ## 依赖关系
//! - 实现 `workflow/runner.rs` 的 `PhononEngine`
//! - 使用 `backend/conf.rs`, `parsers/`
//! - 使用 `tokio::process` 运行驱动

use crate::backend::conf;
use crate::error::{QhaError, Result};
use crate::models::{Crystal, GruneisenPrediction, PhononOutput, PhononSettings};
use crate::parsers::{dat, outcar, poscar, thermal_yaml};
use crate::workflow::runner::{PhononEngine, PhononJob, PredictionJob, TaskHandle};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;

/// 子进程驱动引擎
pub struct DriverEngine {
    /// 驱动命令（每个子任务调用一次）
    command: String,

    /// 作业根目录
    workdir: PathBuf,

    /// 可选的 phonopy.conf 模板文本；存在时只做 PRESSURE 插入
    conf_template: Option<String>,

    /// 并发进程许可
    permits: Arc<Semaphore>,
}

impl DriverEngine {
    /// 创建引擎；`jobs` 为最大并发驱动进程数
    pub fn new(command: impl Into<String>, workdir: impl Into<PathBuf>, jobs: usize) -> Self {
        DriverEngine {
            command: command.into(),
            workdir: workdir.into(),
            conf_template: None,
            permits: Arc::new(Semaphore::new(jobs.max(1))),
        }
    }

    /// 使用用户提供的 phonopy.conf 模板
    pub fn with_conf_template(mut self, template: String) -> Self {
        self.conf_template = Some(template);
        self
    }

    fn render_conf(&self, phonon: &PhononSettings, stress_gpa: f64, use_nac: bool) -> String {
        match &self.conf_template {
            Some(template) => conf::upsert_pressure_tag(template, stress_gpa),
            None => conf::generate_phonopy_conf(phonon, stress_gpa, use_nac),
        }
    }
}

/// 写入作业目录的输入文件
async fn prepare_job_dir(dir: &Path, structure: &Crystal, conf_text: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| QhaError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;

    let poscar_path = dir.join("POSCAR");
    tokio::fs::write(&poscar_path, poscar::to_poscar_string(structure))
        .await
        .map_err(|e| QhaError::FileWriteError {
            path: poscar_path.display().to_string(),
            source: e,
        })?;

    let conf_path = dir.join("phonopy.conf");
    tokio::fs::write(&conf_path, conf_text)
        .await
        .map_err(|e| QhaError::FileWriteError {
            path: conf_path.display().to_string(),
            source: e,
        })?;

    Ok(())
}

/// 在作业目录中运行驱动命令并等待其退出
async fn run_driver(command: &str, dir: &Path, args: &[String]) -> Result<()> {
    let output = Command::new(command)
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QhaError::CommandNotFound {
                    command: command.to_string(),
                }
            } else {
                QhaError::CommandFailed {
                    command: command.to_string(),
                    stderr: e.to_string(),
                }
            }
        })?;

    if !output.status.success() {
        return Err(QhaError::CommandFailed {
            command: format!("{} {}", command, args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// 组装驱动命令行参数
fn driver_args(
    mode: &str,
    pressure_gpa: f64,
    cutoff_ev: f64,
    kpoint_spacing: f64,
    optimize: bool,
    use_nac: bool,
) -> Vec<String> {
    let mut args = vec![
        "--mode".to_string(),
        mode.to_string(),
        "--pressure".to_string(),
        pressure_gpa.to_string(),
        "--cutoff".to_string(),
        cutoff_ev.to_string(),
        "--kspacing".to_string(),
        kpoint_spacing.to_string(),
    ];
    if optimize {
        args.push("--optimize".to_string());
    }
    if use_nac {
        args.push("--nac".to_string());
    }
    args
}

#[async_trait]
impl PhononEngine for DriverEngine {
    async fn submit_prediction(
        &self,
        job: PredictionJob,
    ) -> Result<TaskHandle<GruneisenPrediction>> {
        let dir = self.workdir.join("gruneisen");
        let conf_text = self.render_conf(&job.phonon, job.pressure, job.use_nac);
        let command = self.command.clone();
        let permits = self.permits.clone();
        let args = driver_args(
            "gruneisen",
            job.pressure,
            job.electronic.cutoff_ev,
            job.electronic.kpoint_spacing,
            false,
            job.use_nac,
        );

        Ok(TaskHandle::new(
            0,
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| QhaError::Other(e.to_string()))?;

                prepare_job_dir(&dir, &job.structure, &conf_text).await?;
                run_driver(&command, &dir, &args).await?;

                // stress_range.dat 单行两列：应力区间下界与上界
                let rows = dat::parse_two_column(&dir.join("stress_range.dat"))?;
                let (lo, hi) = rows[0];
                Ok(GruneisenPrediction::new(lo, hi))
            }),
        ))
    }

    async fn submit_phonon(&self, job: PhononJob) -> Result<TaskHandle<PhononOutput>> {
        let dir = self.workdir.join(format!("phonon_{:03}", job.index));
        let conf_text = self.render_conf(&job.phonon, job.stress, job.use_nac);
        let command = self.command.clone();
        let permits = self.permits.clone();
        let args = driver_args(
            "phonon",
            job.stress,
            job.electronic.cutoff_ev,
            job.electronic.kpoint_spacing,
            job.optimize,
            job.use_nac,
        );

        Ok(TaskHandle::new(
            job.index,
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| QhaError::Other(e.to_string()))?;

                prepare_job_dir(&dir, &job.structure, &conf_text).await?;
                run_driver(&command, &dir, &args).await?;

                let structure = poscar::parse_poscar_file(&dir.join("CONTCAR"))?;
                let relax = outcar::parse_outcar(&dir.join("OUTCAR"))?;
                let thermal = thermal_yaml::parse_thermal_file(&dir.join("thermal_properties.yaml"))?;

                Ok(PhononOutput {
                    structure,
                    energy: relax.energy_ev,
                    stress: relax.stress_gpa,
                    thermal,
                })
            }),
        ))
    }
}
