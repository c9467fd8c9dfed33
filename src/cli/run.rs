//! # run 子命令 CLI 定义
//!
//! 运行完整 QHA 工作流的参数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/run.rs`

use clap::Args;
use std::path::PathBuf;

/// run 子命令参数
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input structure file (POSCAR/CONTCAR)
    #[arg(long)]
    pub structure: PathBuf,

    /// Root directory for job folders
    #[arg(long, default_value = "qha_jobs")]
    pub workdir: PathBuf,

    /// Driver command executed once per sub-calculation
    #[arg(long, default_value = "qha-driver")]
    pub driver: String,

    /// phonopy-qha command used for the final reduction
    #[arg(long, default_value = "phonopy-qha")]
    pub qha_command: String,

    // ─────────────────────────────────────────────────────────────
    // Sampling options
    // ─────────────────────────────────────────────────────────────
    /// Number of stress samples across the expanded range
    #[arg(long, default_value_t = 10)]
    pub samples: usize,

    /// Disable the non-analytical (long-range) correction
    #[arg(long, default_value_t = false)]
    pub no_nac: bool,

    /// Maximum number of concurrent driver processes (0 = logical CPUs)
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,

    // ─────────────────────────────────────────────────────────────
    // Phonon settings
    // ─────────────────────────────────────────────────────────────
    /// Supercell expansion (comma-separated, e.g. '2,2,2')
    #[arg(long, default_value = "2,2,2")]
    pub supercell: String,

    /// q-point mesh (comma-separated, e.g. '20,20,20')
    #[arg(long, default_value = "20,20,20")]
    pub mesh: String,

    /// Atomic displacement distance (Angstrom)
    #[arg(long, default_value_t = 0.01)]
    pub displacement: f64,

    /// Maximum temperature for thermal properties (K)
    #[arg(long, default_value_t = 1000.0)]
    pub t_max: f64,

    /// Temperature step (K)
    #[arg(long, default_value_t = 10.0)]
    pub t_step: f64,

    // ─────────────────────────────────────────────────────────────
    // Electronic settings
    // ─────────────────────────────────────────────────────────────
    /// Plane-wave cutoff energy (eV)
    #[arg(long, default_value_t = 520.0)]
    pub cutoff: f64,

    /// k-point spacing (1/Angstrom)
    #[arg(long, default_value_t = 0.03)]
    pub kspacing: f64,

    // ─────────────────────────────────────────────────────────────
    // Output options
    // ─────────────────────────────────────────────────────────────
    /// phonopy .conf template file; the per-sample PRESSURE tag is upserted
    #[arg(long)]
    pub conf_template: Option<PathBuf>,

    /// Write published quantities to this CSV file
    #[arg(long, default_value = "qha_results.csv")]
    pub output: PathBuf,

    /// Plot this published quantity against temperature (PNG)
    #[arg(long)]
    pub plot: Option<String>,
}
