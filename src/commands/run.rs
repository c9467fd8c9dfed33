//! # run 命令实现
//!
//! 装配驱动引擎与 phonopy-qha 归约器，运行完整 QHA 工作流，
//! 并把发布结果打印为表格、导出 CSV、可选绘图。
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 使用 `workflow/`, `backend/`, `parsers/`, `report/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::backend::{DriverEngine, QhaToolReducer};
use crate::cli::run::RunArgs;
use crate::error::{QhaError, Result};
use crate::models::{ElectronicSettings, PhononSettings, QhaResult, QhaSettings};
use crate::parsers;
use crate::report;
use crate::utils::{output, progress};
use crate::workflow::{ProgressEvent, QhaOrchestrator};

use indicatif::ProgressBar;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tabled::{Table, Tabled};

/// 结果摘要行
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

/// 执行 run 命令
pub async fn execute(args: RunArgs) -> Result<()> {
    output::print_header("QHA Workflow");

    if !args.structure.exists() {
        return Err(QhaError::FileNotFound {
            path: args.structure.display().to_string(),
        });
    }
    if args.workdir.exists() && !args.workdir.is_dir() {
        return Err(QhaError::DirectoryNotFound {
            path: args.workdir.display().to_string(),
        });
    }

    let crystal = parsers::parse_structure_file(&args.structure)?;
    output::print_info(&format!(
        "Structure: {} ({} atoms, V = {:.3} A^3)",
        crystal.formula(),
        crystal.atoms.len(),
        crystal.volume()
    ));

    let settings = build_settings(&args)?;
    output::print_info(&format!(
        "Sampling {} stresses, NAC {}",
        settings.sample_count,
        if settings.use_nac { "on" } else { "off" }
    ));

    let jobs = if args.jobs == 0 {
        num_cpus::get()
    } else {
        args.jobs
    };

    let mut engine = DriverEngine::new(args.driver.as_str(), &args.workdir, jobs);
    if let Some(template_path) = &args.conf_template {
        let template = fs::read_to_string(template_path).map_err(|e| QhaError::FileReadError {
            path: template_path.display().to_string(),
            source: e,
        })?;
        engine = engine.with_conf_template(template);
    }
    let reducer = QhaToolReducer::new(args.qha_command.as_str(), &args.workdir);

    // 阶段转移打印 + 汇合阶段的进度条
    let bar: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    let sink_bar = bar.clone();
    let orchestrator = QhaOrchestrator::new(Arc::new(engine), Arc::new(reducer)).with_progress(
        Box::new(move |event| match event {
            ProgressEvent::Stage(stage) => {
                let mut guard = sink_bar.lock().unwrap();
                if let Some(pb) = guard.take() {
                    pb.finish_and_clear();
                }
                output::print_stage(&stage.to_string());
                // 预测阶段时长不可知，挂一个 spinner
                if let crate::workflow::RunStage::Predicting = stage {
                    *guard = Some(progress::create_spinner("Waiting for Gruneisen prediction"));
                }
            }
            ProgressEvent::Settled { done, total } => {
                let mut guard = sink_bar.lock().unwrap();
                let pb = guard.get_or_insert_with(|| {
                    progress::create_progress_bar(total as u64, "Phonon tasks")
                });
                pb.set_position(done as u64);
            }
        }),
    );

    let result = orchestrator.run(crystal, settings).await?;

    print_summary(&result);

    report::export::results_to_csv(&result, &args.output)?;
    output::print_done(&format!(
        "Exported {} quantities to '{}'",
        result.len(),
        args.output.display()
    ));

    if let Some(quantity) = &args.plot {
        plot_quantity(&result, quantity)?;
    }

    output::print_success(&format!(
        "QHA workflow finished: {} quantities published",
        result.len()
    ));

    Ok(())
}

/// 由命令行参数装配工作流设置
fn build_settings(args: &RunArgs) -> Result<QhaSettings> {
    let phonon = PhononSettings {
        supercell: parse_triplet(&args.supercell)?,
        mesh: parse_triplet(&args.mesh)?,
        displacement_distance: args.displacement,
        t_max: args.t_max,
        t_step: args.t_step,
    };
    let electronic = ElectronicSettings {
        cutoff_ev: args.cutoff,
        kpoint_spacing: args.kspacing,
    };

    let mut settings =
        QhaSettings::new(phonon, electronic).with_sample_count(args.samples);
    if args.no_nac {
        settings = settings.without_nac();
    }

    settings.validate()?;
    Ok(settings)
}

/// 解析 'a,b,c' 形式的三元组
fn parse_triplet(raw: &str) -> Result<[u32; 3]> {
    let parts: Vec<u32> = raw
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| QhaError::InvalidArgument(format!("Invalid triplet: '{}'", raw)))?;

    if parts.len() != 3 {
        return Err(QhaError::InvalidArgument(format!(
            "Expected three comma-separated values, got '{}'",
            raw
        )));
    }

    Ok([parts[0], parts[1], parts[2]])
}

/// 打印发布量摘要表
fn print_summary(result: &QhaResult) {
    output::print_header("Published Quantities");

    let rows: Vec<SummaryRow> = result
        .names()
        .filter_map(|name| result.get(name).map(|values| (name, values)))
        .map(|(name, values)| {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            SummaryRow {
                quantity: name.to_string(),
                points: values.len(),
                min: format!("{:.6}", min),
                max: format!("{:.6}", max),
            }
        })
        .collect();

    println!("{}", Table::new(rows));
}

/// 绘制指定发布量随温度的曲线
fn plot_quantity(result: &QhaResult, quantity: &str) -> Result<()> {
    let temperatures = result.get("temperature");
    let values = result.get(quantity);

    match (temperatures, values) {
        (Some(temperatures), Some(values)) if temperatures.len() == values.len() => {
            let path = PathBuf::from(format!("{}.png", quantity));
            report::plot::plot_quantity(temperatures, values, quantity, &path)?;
            output::print_done(&format!("Plot written to '{}'", path.display()));
        }
        (_, None) => {
            output::print_warning(&format!(
                "Quantity '{}' was not published; nothing to plot",
                quantity
            ));
        }
        _ => {
            output::print_warning(&format!(
                "Quantity '{}' is not aligned with the temperature axis; skipping plot",
                quantity
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triplet() {
        assert_eq!(parse_triplet("2,2,2").unwrap(), [2, 2, 2]);
        assert_eq!(parse_triplet(" 8, 8, 4 ").unwrap(), [8, 8, 4]);
        assert!(parse_triplet("2,2").is_err());
        assert!(parse_triplet("2,2,x").is_err());
    }
}
