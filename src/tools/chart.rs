//! 图表输出：把数据集渲染为 SVG 文件
//!
//! 文件名 = 前缀 + 时间戳 + 进程内单调计数，同一进程内并发调用也不会覆盖。

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::AgentError;
use crate::tools::dataset::Dataset;

static CHART_COUNTER: AtomicU64 = AtomicU64::new(0);

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 360.0;
const MARGIN: f64 = 40.0;

/// 生成唯一文件名：`{prefix}_{YYYYmmdd_HHMMSS}_{n}.svg`
pub fn unique_file_name(prefix: &str) -> String {
    let n = CHART_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}_{}_{}.svg",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        n
    )
}

/// 写出数据集的图表：首列的折线图 + 其余列合计的柱状图；返回写出的路径
pub fn render_dataset_charts(dataset: &Dataset, out_dir: &Path) -> Result<Vec<PathBuf>, AgentError> {
    std::fs::create_dir_all(out_dir).map_err(|e| AgentError::Chart(e.to_string()))?;
    let mut written = Vec::new();

    if let Some(first) = dataset.columns().first() {
        let svg = line_chart(&format!("{}の推移", first.name), &first.values);
        written.push(write_svg(out_dir, "trend", &svg)?);
    }

    if dataset.columns().len() > 1 {
        let bars: Vec<(String, f64)> = dataset.columns()[1..]
            .iter()
            .map(|c| (c.name.clone(), c.values.iter().sum()))
            .collect();
        let svg = bar_chart("列別合計", &bars);
        written.push(write_svg(out_dir, "totals", &svg)?);
    }

    tracing::debug!(count = written.len(), dir = %out_dir.display(), "charts written");
    Ok(written)
}

fn write_svg(out_dir: &Path, prefix: &str, svg: &str) -> Result<PathBuf, AgentError> {
    let path = out_dir.join(unique_file_name(prefix));
    std::fs::write(&path, svg).map_err(|e| AgentError::Chart(format!("{}: {e}", path.display())))?;
    Ok(path)
}

fn svg_open(title: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\">\n\
         <text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">{}</text>\n",
        WIDTH / 2.0,
        escape(title)
    )
}

fn line_chart(title: &str, values: &[f64]) -> String {
    let mut svg = svg_open(title);
    let (min, max) = bounds(values);
    let span = if max > min { max - min } else { 1.0 };
    let step = if values.len() > 1 {
        (WIDTH - 2.0 * MARGIN) / (values.len() - 1) as f64
    } else {
        0.0
    };
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = MARGIN + step * i as f64;
            let y = HEIGHT - MARGIN - (v - min) / span * (HEIGHT - 2.0 * MARGIN);
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(
        svg,
        "<polyline fill=\"none\" stroke=\"steelblue\" stroke-width=\"2\" points=\"{points}\"/>"
    );
    svg.push_str("</svg>\n");
    svg
}

fn bar_chart(title: &str, bars: &[(String, f64)]) -> String {
    let mut svg = svg_open(title);
    let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    let slot = (WIDTH - 2.0 * MARGIN) / bars.len().max(1) as f64;
    for (i, (label, value)) in bars.iter().enumerate() {
        let h = value / max * (HEIGHT - 3.0 * MARGIN);
        let x = MARGIN + slot * i as f64 + slot * 0.1;
        let y = HEIGHT - MARGIN - h;
        let _ = writeln!(
            svg,
            "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{:.1}\" height=\"{h:.1}\" fill=\"darkorange\"/>",
            slot * 0.8
        );
        let _ = writeln!(
            svg,
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"11\">{}</text>",
            x + slot * 0.4,
            HEIGHT - MARGIN / 2.0,
            escape(label)
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn bounds(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
