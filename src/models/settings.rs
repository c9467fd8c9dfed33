//! # 工作流设置数据模型
//!
//! 声子计算设置、电子结构求解器设置与 QHA 工作流设置。
//! 两类设置都是必填项；采样数默认 10，长程校正默认开启。
//!
//! ## 依赖关系
//! - 被 `workflow/`, `backend/`, `commands/` 使用
//! - 使用 `error.rs`

use crate::error::{QhaError, Result};
use serde::{Deserialize, Serialize};

/// 声子计算设置（对应 phonopy 的主要标签）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhononSettings {
    /// 超胞扩展 (DIM)
    pub supercell: [u32; 3],

    /// q 点网格 (MP)
    pub mesh: [u32; 3],

    /// 原子位移距离 (Å)
    pub displacement_distance: f64,

    /// 热力学性质计算的最高温度 (K)
    pub t_max: f64,

    /// 温度步长 (K)
    pub t_step: f64,
}

impl Default for PhononSettings {
    fn default() -> Self {
        PhononSettings {
            supercell: [2, 2, 2],
            mesh: [20, 20, 20],
            displacement_distance: 0.01,
            t_max: 1000.0,
            t_step: 10.0,
        }
    }
}

impl PhononSettings {
    /// 校验设置是否完整有效
    pub fn validate(&self) -> Result<()> {
        if self.supercell.iter().any(|&n| n == 0) {
            return Err(QhaError::MissingSettings(
                "phonon supercell must be non-zero in every direction".to_string(),
            ));
        }
        if self.mesh.iter().any(|&n| n == 0) {
            return Err(QhaError::MissingSettings(
                "phonon q-point mesh must be non-zero in every direction".to_string(),
            ));
        }
        if self.displacement_distance <= 0.0 {
            return Err(QhaError::MissingSettings(
                "displacement distance must be positive".to_string(),
            ));
        }
        if self.t_step <= 0.0 || self.t_max < 0.0 {
            return Err(QhaError::MissingSettings(
                "temperature range must satisfy t_max >= 0 and t_step > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 电子结构求解器设置（原样传递给外部驱动）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectronicSettings {
    /// 平面波截断能 (eV)
    pub cutoff_ev: f64,

    /// k 点间距 (1/Å)
    pub kpoint_spacing: f64,
}

impl Default for ElectronicSettings {
    fn default() -> Self {
        ElectronicSettings {
            cutoff_ev: 520.0,
            kpoint_spacing: 0.03,
        }
    }
}

impl ElectronicSettings {
    /// 校验设置是否完整有效
    pub fn validate(&self) -> Result<()> {
        if self.cutoff_ev <= 0.0 {
            return Err(QhaError::MissingSettings(
                "plane-wave cutoff must be positive".to_string(),
            ));
        }
        if self.kpoint_spacing <= 0.0 {
            return Err(QhaError::MissingSettings(
                "k-point spacing must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// QHA 工作流设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QhaSettings {
    /// 声子计算设置
    pub phonon: PhononSettings,

    /// 电子结构求解器设置
    pub electronic: ElectronicSettings,

    /// 应力采样数 N
    pub sample_count: usize,

    /// 是否启用非解析（长程）校正
    pub use_nac: bool,
}

impl QhaSettings {
    /// 创建设置；采样数默认 10，长程校正默认开启
    pub fn new(phonon: PhononSettings, electronic: ElectronicSettings) -> Self {
        QhaSettings {
            phonon,
            electronic,
            sample_count: 10,
            use_nac: true,
        }
    }

    /// 设置应力采样数
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    /// 关闭长程校正
    pub fn without_nac(mut self) -> Self {
        self.use_nac = false;
        self
    }

    /// 校验全部设置；N = 0 是配置错误而非空成功
    pub fn validate(&self) -> Result<()> {
        self.phonon.validate()?;
        self.electronic.validate()?;
        if self.sample_count == 0 {
            return Err(QhaError::InvalidSampleCount(0));
        }
        Ok(())
    }
}
