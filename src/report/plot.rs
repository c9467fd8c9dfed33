//! # QHA 结果图表生成
//!
//! 使用 `plotters` 库绘制发布量随温度的变化曲线。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `plotters` 渲染图表

use crate::error::{QhaError, Result};
use plotters::prelude::*;
use std::path::Path;

/// 绘制单个发布量对温度的曲线（PNG）
pub fn plot_quantity(
    temperatures: &[f64],
    values: &[f64],
    quantity: &str,
    output_path: &Path,
) -> Result<()> {
    if temperatures.len() != values.len() || temperatures.len() < 2 {
        return Err(QhaError::InvalidArgument(format!(
            "cannot plot '{}': need at least 2 aligned points, got {} temperatures and {} values",
            quantity,
            temperatures.len(),
            values.len()
        )));
    }

    let x_min = temperatures.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = temperatures
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let y_min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // y 方向留 5% 边距；常数曲线给一个最小跨度
    let y_pad = ((y_max - y_min) * 0.05).max(1e-6);
    let y_range = (y_min - y_pad)..(y_max + y_pad);

    let root = BitMapBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(quantity, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_range)
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Temperature (K)")
        .y_desc(quantity)
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            temperatures.iter().cloned().zip(values.iter().cloned()),
            &BLUE,
        ))
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    root.present()
        .map_err(|e| QhaError::Other(e.to_string()))?;

    Ok(())
}
