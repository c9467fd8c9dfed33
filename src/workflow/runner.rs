//! # 子任务运行接口
//!
//! 定义声子计算引擎的能力边界：提交预测与声子子任务并返回可等待的
//! 任务句柄。引擎作为显式依赖注入编排器，不走任何全局状态。
//!
//! ## 依赖关系
//! - 被 `workflow/orchestrator.rs` 使用
//! - 由 `backend/driver.rs` 实现
//! - 使用 `models/`, `error.rs`

use crate::error::{QhaError, Result};
use crate::models::{
    Crystal, ElectronicSettings, GruneisenPrediction, PhononOutput, PhononSettings,
};
use async_trait::async_trait;
use tokio::task::JoinHandle;

/// Gruneisen 预测子任务参数
#[derive(Debug, Clone)]
pub struct PredictionJob {
    pub structure: Crystal,

    /// 施加压力 (GPa)；预测阶段恒为 0
    pub pressure: f64,

    pub phonon: PhononSettings,
    pub electronic: ElectronicSettings,
    pub use_nac: bool,
}

/// 声子子任务参数：按应力采样展开的一份自包含描述
///
/// 除 `index` 与 `stress` 外所有字段对全部样本相同。
#[derive(Debug, Clone)]
pub struct PhononJob {
    /// 采样序号 i ∈ [0, N)，贯穿提交、结算与聚合的唯一关联键
    pub index: usize,

    /// 施加应力 (GPa)
    pub stress: f64,

    pub structure: Crystal,
    pub phonon: PhononSettings,
    pub electronic: ElectronicSettings,

    /// 是否对几何结构做弛豫；展开的样本恒为 true
    pub optimize: bool,

    pub use_nac: bool,
}

/// 已提交子任务的句柄
///
/// `wait` 消耗句柄并挂起调用者直到子任务结算。
/// 句柄结算后即失效，move 语义保证不会复用。
pub struct TaskHandle<T> {
    index: usize,
    inner: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn new(index: usize, inner: JoinHandle<Result<T>>) -> Self {
        TaskHandle { index, inner }
    }

    /// 提交时固定的采样序号
    pub fn index(&self) -> usize {
        self.index
    }

    /// 挂起直到子任务结算，返回其结果
    pub async fn wait(self) -> Result<T> {
        match self.inner.await {
            Ok(result) => result,
            Err(e) => Err(QhaError::Other(format!(
                "task {} panicked or was aborted: {}",
                self.index, e
            ))),
        }
    }
}

/// 声子计算引擎能力
///
/// 提交必须是非阻塞的；同步失败只允许出现在参数本身非法时，
/// 运行期故障通过句柄结算报告。
#[async_trait]
pub trait PhononEngine: Send + Sync {
    /// 提交一次 Gruneisen 预测计算
    async fn submit_prediction(
        &self,
        job: PredictionJob,
    ) -> Result<TaskHandle<GruneisenPrediction>>;

    /// 提交一次声子计算
    async fn submit_phonon(&self, job: PhononJob) -> Result<TaskHandle<PhononOutput>>;
}

/// 按采样序号定宽、每槽只写一次的结果存储
///
/// 宽度在规划阶段后固定；支持在其余任务未结算时部分填充，
/// 有序读取只在全部槽位就绪后发生。
pub struct ResultStore {
    slots: Vec<Option<PhononOutput>>,
}

impl ResultStore {
    /// 创建宽度为 N 的空存储
    pub fn new(width: usize) -> Self {
        ResultStore {
            slots: (0..width).map(|_| None).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// 已填充的槽位数
    pub fn completed(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    /// 记录序号 `index` 的结果；重复写入是错误
    pub fn insert(&mut self, index: usize, output: PhononOutput) -> Result<()> {
        let width = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| QhaError::InvalidArgument(format!(
                "sample index {} out of range (store width {})",
                index, width
            )))?;
        if slot.is_some() {
            return Err(QhaError::DuplicateResult { index });
        }
        *slot = Some(output);
        Ok(())
    }

    /// 按序号升序取出全部结果；任一槽位缺失即错误
    pub fn into_ordered(self) -> Result<Vec<PhononOutput>> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(QhaError::MissingResult { index }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice, ThermalTable};

    fn output(tag: f64) -> PhononOutput {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        PhononOutput {
            structure: Crystal::new("X", lattice, vec![Atom::new("X", [0.0, 0.0, 0.0])]),
            energy: tag,
            stress: [[0.0; 3]; 3],
            thermal: ThermalTable {
                temperatures: vec![0.0, 100.0],
                entropy: vec![0.0, 1.0],
                free_energy: vec![0.0, -1.0],
                heat_capacity: vec![0.0, 2.0],
            },
        }
    }

    #[test]
    fn test_store_write_once_discipline() {
        let mut store = ResultStore::new(2);
        assert_eq!(store.width(), 2);
        store.insert(1, output(1.0)).unwrap();
        assert_eq!(store.completed(), 1);
        assert!(!store.is_complete());

        // 同一槽位第二次写入被拒绝
        let err = store.insert(1, output(2.0)).unwrap_err();
        assert!(matches!(err, QhaError::DuplicateResult { index: 1 }));
    }

    #[test]
    fn test_store_rejects_out_of_range_index() {
        let mut store = ResultStore::new(2);
        let err = store.insert(5, output(0.0)).unwrap_err();
        assert!(matches!(err, QhaError::InvalidArgument(_)));
    }

    #[test]
    fn test_store_orders_by_index_not_arrival() {
        let mut store = ResultStore::new(3);
        store.insert(2, output(2.0)).unwrap();
        store.insert(0, output(0.0)).unwrap();
        store.insert(1, output(1.0)).unwrap();
        assert!(store.is_complete());

        let ordered = store.into_ordered().unwrap();
        let energies: Vec<f64> = ordered.iter().map(|o| o.energy).collect();
        assert_eq!(energies, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_store_reports_missing_slot() {
        let mut store = ResultStore::new(2);
        store.insert(0, output(0.0)).unwrap();
        let err = store.into_ordered().unwrap_err();
        assert!(matches!(err, QhaError::MissingResult { index: 1 }));
    }
}
