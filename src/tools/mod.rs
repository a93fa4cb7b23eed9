//! 领域工具：系统指标、检索、示例数据集、图表输出

pub mod chart;
pub mod dataset;
pub mod metrics;
pub mod search;

pub use chart::render_dataset_charts;
pub use dataset::{sample_sales_dataset, AnalysisInput, Column, ColumnStats, Dataset};
pub use metrics::{collect_blocking, FixedMetrics, Metrics, MetricsProvider, SysinfoMetrics};
pub use search::{MockSearchProvider, SearchProvider, SearchResult};
