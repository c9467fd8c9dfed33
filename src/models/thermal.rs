//! # 热力学数据模型
//!
//! 单次声子计算的热力学性质表、Gruneisen 预测结果、
//! 聚合后的 QHA 输入以及最终发布的 QHA 结果。
//!
//! ## 依赖关系
//! - 被 `workflow/`, `backend/`, `report/` 使用
//! - 使用 `models/structure.rs`

use crate::models::Crystal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 热力学性质表：按温度索引的平行序列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalTable {
    /// 温度轴 (K)
    pub temperatures: Vec<f64>,

    /// 熵 (J/K/mol)
    pub entropy: Vec<f64>,

    /// 自由能 (kJ/mol)
    pub free_energy: Vec<f64>,

    /// 定容热容 (J/K/mol)
    pub heat_capacity: Vec<f64>,
}

impl ThermalTable {
    /// 温度点数
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// 校验四列长度一致且非空；返回具体原因供上层附加样本序号
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.temperatures.is_empty() {
            return Err("empty temperature axis".to_string());
        }
        let len = self.temperatures.len();
        if self.entropy.len() != len
            || self.free_energy.len() != len
            || self.heat_capacity.len() != len
        {
            return Err(format!(
                "column lengths differ: temperatures={}, entropy={}, free_energy={}, heat_capacity={}",
                len,
                self.entropy.len(),
                self.free_energy.len(),
                self.heat_capacity.len()
            ));
        }
        Ok(())
    }
}

/// Gruneisen 预测结果：应力采样的种子区间
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GruneisenPrediction {
    /// 应力区间 (GPa)，有序对 (min, max)
    pub stress_range: (f64, f64),
}

impl GruneisenPrediction {
    pub fn new(min: f64, max: f64) -> Self {
        GruneisenPrediction {
            stress_range: (min, max),
        }
    }
}

/// 单个声子子任务的完整输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhononOutput {
    /// 弛豫后的结构
    pub structure: Crystal,

    /// 总能量 (eV)
    pub energy: f64,

    /// 应力张量 (GPa)
    pub stress: [[f64; 3]; 3],

    /// 热力学性质表
    pub thermal: ThermalTable,
}

impl PhononOutput {
    /// 弛豫后晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        self.structure.volume()
    }

    /// 应力张量对角元平均
    pub fn stress_average(&self) -> f64 {
        (self.stress[0][0] + self.stress[1][1] + self.stress[2][2]) / 3.0
    }
}

/// 聚合后的 QHA 输入
///
/// 体积/能量/应力各长 N；三个矩阵为温度主序，形状 (T × N)。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QhaInput {
    pub volumes: Vec<f64>,
    pub energies: Vec<f64>,
    pub stresses: Vec<f64>,

    /// 全部样本共享的温度轴
    pub temperatures: Vec<f64>,

    pub free_energy: Vec<Vec<f64>>,
    pub entropy: Vec<Vec<f64>>,
    pub heat_capacity: Vec<Vec<f64>>,
}

impl QhaInput {
    /// 样本数 N
    pub fn sample_count(&self) -> usize {
        self.volumes.len()
    }

    /// 温度点数 T
    pub fn temperature_count(&self) -> usize {
        self.temperatures.len()
    }
}

/// 发布的 QHA 结果：量名到数值数组的映射
///
/// 量名由外部归约程序决定，核心不做解释，原样透传。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QhaResult {
    arrays: BTreeMap<String, Vec<f64>>,
}

impl QhaResult {
    pub fn new() -> Self {
        QhaResult::default()
    }

    /// 记录一个发布量
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.arrays.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.arrays.get(name).map(|v| v.as_slice())
    }

    /// 已发布的量名（字典序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn table(points: usize) -> ThermalTable {
        ThermalTable {
            temperatures: (0..points).map(|t| t as f64 * 10.0).collect(),
            entropy: vec![0.5; points],
            free_energy: vec![-1.0; points],
            heat_capacity: vec![2.0; points],
        }
    }

    #[test]
    fn test_thermal_table_validate() {
        assert!(table(5).validate().is_ok());
        assert_eq!(table(5).len(), 5);
        assert!(!table(5).is_empty());

        let mut bad = table(5);
        bad.entropy.pop();
        assert!(bad.validate().unwrap_err().contains("column lengths"));

        let empty = table(0);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_stress_average_uses_diagonal_only() {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        let output = PhononOutput {
            structure: Crystal::new("X", lattice, vec![Atom::new("X", [0.0, 0.0, 0.0])]),
            energy: -10.0,
            stress: [[1.0, 9.0, 9.0], [9.0, 2.0, 9.0], [9.0, 9.0, 3.0]],
            thermal: table(3),
        };
        assert!((output.stress_average() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_qha_result_is_a_mapping() {
        let mut result = QhaResult::new();
        result.insert("thermal_expansion", vec![1.0, 2.0]);
        result.insert("bulk_modulus", vec![100.0]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("thermal_expansion"), Some(&[1.0, 2.0][..]));
        let names: Vec<&str> = result.names().collect();
        assert_eq!(names, vec!["bulk_modulus", "thermal_expansion"]);
    }
}
