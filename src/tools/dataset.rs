//! 分析用数据：示例销售数据集、列统计、分析输入
//!
//! 示例数据使用固定种子（123）生成，同一进程内、不同进程间结果一致。

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;

/// 示例数据的固定种子
pub const SAMPLE_SEED: u64 = 123;

const SAMPLE_PREVIEW_CHARS: usize = 1000;

/// 数值列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// 带日期索引的表格数据；每列长度与日期数相同，由 `Dataset::new` 保证
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

/// 单列基本统计（std 为样本标准差）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Dataset {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, AgentError> {
        if let Some(ragged) = columns.iter().find(|c| c.values.len() != dates.len()) {
            return Err(AgentError::InvalidInput(format!(
                "column '{}' has {} values for {} dates",
                ragged.name,
                ragged.values.len(),
                dates.len()
            )));
        }
        Ok(Self { dates, columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    /// 含日期列
    pub fn column_count(&self) -> usize {
        self.columns.len() + 1
    }

    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once("日付")
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn stats(&self) -> Vec<ColumnStats> {
        self.columns.iter().filter_map(column_stats).collect()
    }

    /// 前 n 行的文本表格
    pub fn head(&self, n: usize) -> String {
        let mut lines = vec![self.column_names().join("\t")];
        for (row, date) in self.dates.iter().take(n).enumerate() {
            let mut cells = vec![date.format("%Y-%m-%d").to_string()];
            cells.extend(
                self.columns
                    .iter()
                    .filter_map(|c| c.values.get(row).copied().map(format_number)),
            );
            lines.push(cells.join("\t"));
        }
        lines.join("\n")
    }
}

fn column_stats(column: &Column) -> Option<ColumnStats> {
    let count = column.values.len();
    if count == 0 {
        return None;
    }
    let mean = column.values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = column.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    let min = column.values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(ColumnStats {
        name: column.name.clone(),
        count,
        mean,
        std,
        min,
        max,
    })
}

/// 整数值不带小数，其余保留两位
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

/// 2025 年 1 月的示例销售数据（31 天）
pub fn sample_sales_dataset() -> Dataset {
    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
    let dates: Vec<NaiveDate> = (0..31).map(|d| start + Duration::days(d)).collect();
    let n = dates.len();

    let sales = (0..n).map(|_| normal(&mut rng, 100_000.0, 15_000.0)).collect();
    let mut int_column = |low: i64, high: i64| -> Vec<f64> {
        (0..n).map(|_| rng.gen_range(low..high) as f64).collect()
    };
    let product_a = int_column(50, 200);
    let product_b = int_column(30, 100);
    let product_c = int_column(10, 50);
    let customers = int_column(200, 500);

    // 所有列都按 dates 的长度生成
    Dataset {
        dates,
        columns: vec![
            Column { name: "売上高".into(), values: sales },
            Column { name: "商品A販売数".into(), values: product_a },
            Column { name: "商品B販売数".into(), values: product_b },
            Column { name: "商品C販売数".into(), values: product_c },
            Column { name: "顧客数".into(), values: customers },
        ],
    }
}

// Box-Muller
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// 分析猫接受的输入
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Table(Dataset),
    /// 任意 JSON（对象 / 数组 / 标量）
    Json(Value),
}

impl AnalysisInput {
    /// 「データ概要」段落正文
    pub fn overview(&self) -> String {
        match self {
            AnalysisInput::Table(ds) => format!(
                "- 行数: {}\n- 列数: {}\n- 列名: {}",
                ds.row_count(),
                ds.column_count(),
                ds.column_names().join(", ")
            ),
            AnalysisInput::Json(Value::Object(map)) => format!(
                "- データ型: 辞書\n- キー: {}\n- サンプル: {}",
                map.keys().cloned().collect::<Vec<_>>().join(", "),
                truncate_sample(&Value::Object(map.clone()).to_string())
            ),
            AnalysisInput::Json(Value::Array(items)) => format!(
                "- データ型: リスト\n- 要素数: {}\n- サンプル: {}",
                items.len(),
                truncate_sample(&Value::Array(items.iter().take(10).cloned().collect()).to_string())
            ),
            AnalysisInput::Json(other) => format!("- データ型: {}", json_type_name(other)),
        }
    }

    pub fn stats(&self) -> Vec<ColumnStats> {
        match self {
            AnalysisInput::Table(ds) => ds.stats(),
            AnalysisInput::Json(_) => Vec::new(),
        }
    }

    pub fn as_table(&self) -> Option<&Dataset> {
        match self {
            AnalysisInput::Table(ds) => Some(ds),
            AnalysisInput::Json(_) => None,
        }
    }
}

fn truncate_sample(s: &str) -> String {
    if s.chars().count() > SAMPLE_PREVIEW_CHARS {
        let head: String = s.chars().take(SAMPLE_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "真偽値",
        Value::Number(_) => "数値",
        Value::String(_) => "文字列",
        Value::Array(_) => "リスト",
        Value::Object(_) => "辞書",
    }
}
