//! # QHA 工作流编排器
//!
//! 顺序驱动 预测 → 规划 → 展开 → 汇合 → 聚合 → 归约 的状态机。
//! 编排器自身是单逻辑任务，只在阶段边界挂起；N 个声子子任务
//! 并发独立执行，汇合点等待全部句柄结算后才报告整体结果。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 使用 `workflow/runner.rs`, `workflow/planner.rs`, `workflow/aggregate.rs`
//! - 使用 `models/`, `error.rs`

use crate::error::{QhaError, Result};
use crate::models::{Crystal, QhaInput, QhaResult, QhaSettings};
use crate::workflow::aggregate;
use crate::workflow::planner;
use crate::workflow::runner::{PhononEngine, PredictionJob, ResultStore};
use async_trait::async_trait;
use std::sync::Arc;

/// 工作流阶段
///
/// 转移严格向前；`Failed` 可从任何非终态进入，且自身为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Init,
    Predicting,
    Planning,
    FanningOut,
    AwaitingAll,
    Aggregating,
    Reducing,
    Published,
    Failed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStage::Init => "init",
            RunStage::Predicting => "predicting",
            RunStage::Planning => "planning",
            RunStage::FanningOut => "fanning-out",
            RunStage::AwaitingAll => "awaiting-all",
            RunStage::Aggregating => "aggregating",
            RunStage::Reducing => "reducing",
            RunStage::Published => "published",
            RunStage::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// QHA 归约接口：外部状态方程/热力学拟合程序的边界
///
/// 发布量的名称集合由归约方决定，编排器原样透传。
#[async_trait]
pub trait QhaReducer: Send + Sync {
    async fn reduce(&self, input: &QhaInput) -> Result<QhaResult>;
}

/// 运行进度事件
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent {
    /// 进入新阶段
    Stage(RunStage),
    /// 汇合阶段又一个句柄结算
    Settled { done: usize, total: usize },
}

/// 进度回调
pub type ProgressSink = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// QHA 工作流编排器
///
/// 引擎与归约器在构造时注入；一次 `run` 即一次完整的工作流运行。
pub struct QhaOrchestrator {
    engine: Arc<dyn PhononEngine>,
    reducer: Arc<dyn QhaReducer>,
    progress: Option<ProgressSink>,
}

impl QhaOrchestrator {
    pub fn new(engine: Arc<dyn PhononEngine>, reducer: Arc<dyn QhaReducer>) -> Self {
        QhaOrchestrator {
            engine,
            reducer,
            progress: None,
        }
    }

    /// 挂接进度回调
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }

    fn advance(&self, stage: &mut RunStage, next: RunStage) {
        debug_assert!(next > *stage && *stage != RunStage::Published);
        *stage = next;
        self.emit(ProgressEvent::Stage(next));
    }

    /// 运行完整 QHA 工作流，返回发布的结果
    ///
    /// 任何失败都是终态；错误本身携带失败所在阶段（`QhaError::stage`）。
    pub async fn run(&self, structure: Crystal, settings: QhaSettings) -> Result<QhaResult> {
        let mut stage = RunStage::Init;
        match self.run_inner(&mut stage, structure, settings).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.emit(ProgressEvent::Stage(RunStage::Failed));
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        stage: &mut RunStage,
        structure: Crystal,
        settings: QhaSettings,
    ) -> Result<QhaResult> {
        // 全部配置校验先于任何子任务提交；失败时无任何部分工作
        settings.validate()?;

        self.advance(stage, RunStage::Predicting);
        let prediction_handle = self
            .engine
            .submit_prediction(PredictionJob {
                structure: structure.clone(),
                pressure: 0.0,
                phonon: settings.phonon.clone(),
                electronic: settings.electronic.clone(),
                use_nac: settings.use_nac,
            })
            .await?;
        let prediction = prediction_handle
            .wait()
            .await
            .map_err(|e| QhaError::PredictionFailed {
                reason: e.to_string(),
            })?;

        self.advance(stage, RunStage::Planning);
        // 任务列表在任何提交之前整体物化，N 自此固定
        let jobs = planner::expand_jobs(&prediction, &settings, &structure)?;
        let total = jobs.len();

        self.advance(stage, RunStage::FanningOut);
        let mut handles = Vec::with_capacity(total);
        for job in jobs {
            handles.push(self.engine.submit_phonon(job).await?);
        }

        self.advance(stage, RunStage::AwaitingAll);
        // 唯一的汇合点：等待全部句柄结算，出现失败也不提前退出，
        // 避免孤儿化仍在运行的外部计算
        let mut store = ResultStore::new(total);
        let mut failed: Vec<(usize, String)> = Vec::new();
        for handle in handles {
            let index = handle.index();
            match handle.wait().await {
                Ok(output) => store.insert(index, output)?,
                Err(e) => failed.push((index, e.to_string())),
            }
            self.emit(ProgressEvent::Settled {
                done: store.completed() + failed.len(),
                total,
            });
        }
        if !failed.is_empty() {
            return Err(QhaError::PhononTasksFailed { total, failed });
        }

        self.advance(stage, RunStage::Aggregating);
        let results = store.into_ordered()?;
        let input = aggregate::collect_qha_input(&results)?;

        self.advance(stage, RunStage::Reducing);
        let result = self.reducer.reduce(&input).await.map_err(|e| match e {
            QhaError::ReductionFailed { .. } => e,
            other => QhaError::ReductionFailed {
                reason: other.to_string(),
            },
        })?;

        self.advance(stage, RunStage::Published);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Atom, ElectronicSettings, GruneisenPrediction, Lattice, PhononOutput, PhononSettings,
        ThermalTable,
    };
    use crate::workflow::runner::{PhononJob, TaskHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Duration;

    /// 单个伪造子任务的脚本：延迟后成功或失败
    #[derive(Clone)]
    enum Scripted {
        Ok { delay_ms: u64, output: PhononOutput },
        Fail { delay_ms: u64, reason: String },
    }

    /// 可编排的伪造引擎，记录提交与结算计数
    struct FakeEngine {
        prediction: std::result::Result<GruneisenPrediction, String>,
        tasks: Vec<Scripted>,
        prediction_submissions: AtomicUsize,
        phonon_submissions: AtomicUsize,
        settled: Arc<AtomicUsize>,
        stresses: Mutex<Vec<f64>>,
    }

    impl FakeEngine {
        fn new(
            prediction: std::result::Result<GruneisenPrediction, String>,
            tasks: Vec<Scripted>,
        ) -> Self {
            FakeEngine {
                prediction,
                tasks,
                prediction_submissions: AtomicUsize::new(0),
                phonon_submissions: AtomicUsize::new(0),
                settled: Arc::new(AtomicUsize::new(0)),
                stresses: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PhononEngine for FakeEngine {
        async fn submit_prediction(
            &self,
            _job: PredictionJob,
        ) -> Result<TaskHandle<GruneisenPrediction>> {
            self.prediction_submissions.fetch_add(1, Ordering::SeqCst);
            let scripted = self.prediction.clone();
            Ok(TaskHandle::new(
                0,
                tokio::spawn(async move {
                    scripted.map_err(QhaError::Other)
                }),
            ))
        }

        async fn submit_phonon(&self, job: PhononJob) -> Result<TaskHandle<PhononOutput>> {
            self.phonon_submissions.fetch_add(1, Ordering::SeqCst);
            self.stresses.lock().unwrap().push(job.stress);
            let scripted = self.tasks[job.index].clone();
            let settled = self.settled.clone();
            Ok(TaskHandle::new(
                job.index,
                tokio::spawn(async move {
                    let result = match scripted {
                        Scripted::Ok { delay_ms, output } => {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                            Ok(output)
                        }
                        Scripted::Fail { delay_ms, reason } => {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                            Err(QhaError::Other(reason))
                        }
                    };
                    settled.fetch_add(1, Ordering::SeqCst);
                    result
                }),
            ))
        }
    }

    /// 记录收到的 QHA 输入并返回固定结果的伪造归约器
    struct FakeReducer {
        seen: Mutex<Option<QhaInput>>,
    }

    impl FakeReducer {
        fn new() -> Self {
            FakeReducer {
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl QhaReducer for FakeReducer {
        async fn reduce(&self, input: &QhaInput) -> Result<QhaResult> {
            *self.seen.lock().unwrap() = Some(input.clone());
            let mut result = QhaResult::new();
            result.insert("bulk_modulus", vec![100.0; input.temperature_count()]);
            Ok(result)
        }
    }

    fn cubic_output(volume: f64, energy: f64, axis: &[f64]) -> PhononOutput {
        let a = volume.cbrt();
        let lattice = Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]);
        PhononOutput {
            structure: Crystal::new("X", lattice, vec![Atom::new("X", [0.0, 0.0, 0.0])]),
            energy,
            stress: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            thermal: ThermalTable {
                temperatures: axis.to_vec(),
                entropy: vec![1.0; axis.len()],
                free_energy: vec![energy; axis.len()],
                heat_capacity: vec![3.0; axis.len()],
            },
        }
    }

    fn structure() -> Crystal {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        Crystal::new("Si", lattice, vec![Atom::new("Si", [0.0, 0.0, 0.0])])
    }

    fn settings(count: usize) -> QhaSettings {
        QhaSettings::new(PhononSettings::default(), ElectronicSettings::default())
            .with_sample_count(count)
    }

    #[tokio::test]
    async fn test_end_to_end_publishes_result() {
        let v0 = 160.0;
        let axis = [0.0, 150.0, 300.0];
        let engine = Arc::new(FakeEngine::new(
            Ok(GruneisenPrediction::new(0.0, 4.0)),
            vec![
                Scripted::Ok {
                    delay_ms: 5,
                    output: cubic_output(v0 * 0.98, -10.0, &axis),
                },
                Scripted::Ok {
                    delay_ms: 1,
                    output: cubic_output(v0 * 1.03, -9.5, &axis),
                },
            ],
        ));
        let reducer = Arc::new(FakeReducer::new());
        let orchestrator = QhaOrchestrator::new(engine.clone(), reducer.clone());

        let result = orchestrator.run(structure(), settings(2)).await.unwrap();
        assert_eq!(result.get("bulk_modulus").unwrap().len(), 3);

        // [0, 4] 半宽扩展后的采样应力为 [-2, 6]
        let stresses = engine.stresses.lock().unwrap().clone();
        assert!((stresses[0] + 2.0).abs() < 1e-9);
        assert!((stresses[1] - 6.0).abs() < 1e-9);

        let seen = reducer.seen.lock().unwrap();
        let input = seen.as_ref().unwrap();
        assert!((input.volumes[0] - v0 * 0.98).abs() < 1e-6);
        assert!((input.volumes[1] - v0 * 1.03).abs() < 1e-6);
        assert_eq!(input.energies, vec![-10.0, -9.5]);
        assert_eq!(input.free_energy.len(), 3);
        assert!(input.free_energy.iter().all(|row| row.len() == 2));
    }

    #[tokio::test]
    async fn test_aggregation_orders_by_index_not_completion() {
        // 序号越小延迟越大：完成顺序与提交顺序完全相反
        let axis = [0.0, 100.0];
        let tasks: Vec<Scripted> = (0..4)
            .map(|i| Scripted::Ok {
                delay_ms: (4 - i) as u64 * 20,
                output: cubic_output(100.0 + i as f64, -10.0 + i as f64, &axis),
            })
            .collect();
        let engine = Arc::new(FakeEngine::new(
            Ok(GruneisenPrediction::new(1.0, 3.0)),
            tasks,
        ));
        let reducer = Arc::new(FakeReducer::new());
        let orchestrator = QhaOrchestrator::new(engine, reducer.clone());

        orchestrator.run(structure(), settings(4)).await.unwrap();

        let seen = reducer.seen.lock().unwrap();
        let input = seen.as_ref().unwrap();
        for i in 0..4 {
            assert!((input.volumes[i] - (100.0 + i as f64)).abs() < 1e-6);
            assert!((input.energies[i] - (-10.0 + i as f64)).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_fan_in_waits_for_all_before_failing() {
        // 任务 0 立即失败，1-4 稍后完成；失败只能在全部结算后报告
        let axis = [0.0, 100.0];
        let mut tasks = vec![Scripted::Fail {
            delay_ms: 0,
            reason: "solver diverged".to_string(),
        }];
        for i in 1..5 {
            tasks.push(Scripted::Ok {
                delay_ms: 40,
                output: cubic_output(100.0 + i as f64, -10.0, &axis),
            });
        }
        let engine = Arc::new(FakeEngine::new(
            Ok(GruneisenPrediction::new(0.0, 4.0)),
            tasks,
        ));
        let orchestrator = QhaOrchestrator::new(engine.clone(), Arc::new(FakeReducer::new()));

        let err = orchestrator.run(structure(), settings(5)).await.unwrap_err();

        assert_eq!(engine.settled.load(Ordering::SeqCst), 5);
        match err {
            QhaError::PhononTasksFailed { total, failed } => {
                assert_eq!(total, 5);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, 0);
                assert!(failed[0].1.contains("solver diverged"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_samples_never_submit_anything() {
        let engine = Arc::new(FakeEngine::new(
            Ok(GruneisenPrediction::new(0.0, 4.0)),
            vec![],
        ));
        let orchestrator = QhaOrchestrator::new(engine.clone(), Arc::new(FakeReducer::new()));

        let err = orchestrator.run(structure(), settings(0)).await.unwrap_err();

        assert!(matches!(err, QhaError::InvalidSampleCount(0)));
        assert_eq!(engine.prediction_submissions.load(Ordering::SeqCst), 0);
        assert_eq!(engine.phonon_submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prediction_failure_fails_run_before_fan_out() {
        let engine = Arc::new(FakeEngine::new(Err("no convergence".to_string()), vec![]));
        let orchestrator = QhaOrchestrator::new(engine.clone(), Arc::new(FakeReducer::new()));

        let err = orchestrator.run(structure(), settings(3)).await.unwrap_err();

        assert!(matches!(err, QhaError::PredictionFailed { .. }));
        assert_eq!(err.stage(), Some("predicting"));
        assert_eq!(engine.phonon_submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stage_transitions_are_forward_and_complete() {
        let axis = [0.0, 100.0];
        let engine = Arc::new(FakeEngine::new(
            Ok(GruneisenPrediction::new(0.0, 2.0)),
            vec![Scripted::Ok {
                delay_ms: 1,
                output: cubic_output(100.0, -10.0, &axis),
            }],
        ));
        let stages: Arc<Mutex<Vec<RunStage>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = stages.clone();
        let orchestrator = QhaOrchestrator::new(engine, Arc::new(FakeReducer::new()))
            .with_progress(Box::new(move |event| {
                if let ProgressEvent::Stage(stage) = event {
                    recorded.lock().unwrap().push(stage);
                }
            }));

        orchestrator.run(structure(), settings(1)).await.unwrap();

        let seen = stages.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                RunStage::Predicting,
                RunStage::Planning,
                RunStage::FanningOut,
                RunStage::AwaitingAll,
                RunStage::Aggregating,
                RunStage::Reducing,
                RunStage::Published,
            ]
        );
    }
}
