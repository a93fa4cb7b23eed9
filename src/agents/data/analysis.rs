//! 数据分析猫
//!
//! 无数据时返回固定的引导文本（不调用后端，不写文件）。有数据时生成固定段落顺序的报告：
//! リクエスト概要 → データ概要 → 基本統計 → 可視化 → 考察。
//! 配置了图表目录时把图表写到该目录，考察段落来自后端。

use std::path::PathBuf;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError};
use crate::tools::dataset::format_number;
use crate::tools::{render_dataset_charts, AnalysisInput, ColumnStats};

pub const AGENT_ID: &str = "data_analyst_cat";

const INSTRUCTIONS: &str = "あなたは「データ分析猫」という名前の猫猫カンパニーのデータ分析AIエージェントです。
統計分析猫と可視化猫を統括し、データの分析と可視化を行う役割を担っています。

データの特性に合った分析手法を選択し、外れ値や相関と因果の混同に注意してください。
回答は常に日本語で行い、専門用語をできるだけ分かりやすく説明してください。
猫らしい冷静で論理的な口調（「～だニャ」「～と考えられるニャ」）を適度に使用してください。";

/// データ未指定時の案内文
pub const NO_DATA_GUIDANCE: &str = "## 分析データについて

分析を行うには、分析対象のデータが必要ですにゃ。
以下のいずれかの形式でデータをお渡しください：

- 表形式データ（日付列と数値列）
- 辞書形式のデータ（キーと値の組）
- リスト形式のデータ（値の並び）

例えば「先月の売上データを分析して」とお尋ねいただくと、売上データを用意して分析しますにゃ。";

pub struct DataAnalystCat {
    conversation: Conversation,
    chart_dir: Option<PathBuf>,
}

impl DataAnalystCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            chart_dir: ctx.config.analysis.chart_dir.clone(),
        }
    }

    pub async fn analyze(
        &self,
        request: &str,
        data: Option<&AnalysisInput>,
    ) -> Result<String, AgentError> {
        let Some(data) = data else {
            return Ok(NO_DATA_GUIDANCE.to_string());
        };

        let overview = data.overview();
        let stats = data.stats();
        let stats_table = format_stats(&stats);

        let charts = match (data.as_table(), &self.chart_dir) {
            (Some(table), Some(dir)) => render_dataset_charts(table, dir)?,
            _ => Vec::new(),
        };

        let mut data_info = format!("データ概要:\n{overview}");
        if let Some(table) = data.as_table() {
            data_info.push_str(&format!("\n\n先頭10行:\n{}", table.head(10)));
        }
        if !stats.is_empty() {
            data_info.push_str(&format!("\n\n基本統計:\n{stats_table}"));
        }
        let insight = self
            .conversation
            .message(&format!("{request}\n\n{data_info}"))
            .await?;

        let visualization = if charts.is_empty() {
            "グラフは出力されていません。".to_string()
        } else {
            charts
                .iter()
                .map(|p| format!("- {}", p.display()))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(format!(
            "## リクエスト概要\n\n{request}\n\n\
             ## データ概要\n\n{overview}\n\n\
             ## 基本統計\n\n{stats_table}\n\n\
             ## 可視化\n\n{visualization}\n\n\
             ## 考察\n\n{insight}"
        ))
    }
}

fn format_stats(stats: &[ColumnStats]) -> String {
    if stats.is_empty() {
        return "数値列がないため、統計量は算出していません。".to_string();
    }
    let mut lines = vec![
        "| 列 | 件数 | 平均 | 標準偏差 | 最小 | 最大 |".to_string(),
        "|---|---|---|---|---|---|".to_string(),
    ];
    lines.extend(stats.iter().map(|s| {
        format!(
            "| {} | {} | {:.2} | {:.2} | {} | {} |",
            s.name,
            s.count,
            s.mean,
            s.std,
            format_number(s.min),
            format_number(s.max)
        )
    }));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::mock_context;
    use crate::config::AppConfig;
    use crate::tools::sample_sales_dataset;
    use serde_json::json;
    use std::sync::Arc;

    fn section_positions(report: &str) -> Vec<usize> {
        ["## リクエスト概要", "## データ概要", "## 基本統計", "## 可視化", "## 考察"]
            .iter()
            .map(|h| report.find(h).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_no_data_returns_guidance_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.analysis.chart_dir = Some(dir.path().to_path_buf());
        ctx.config = Arc::new(config);
        let cat = DataAnalystCat::new(&ctx);

        let reply = cat.analyze("分析して", None).await.unwrap();
        assert_eq!(reply, NO_DATA_GUIDANCE);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(ctx.store.get_messages(AGENT_ID, 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_table_report_sections_in_order() {
        let cat = DataAnalystCat::new(&mock_context());
        let input = AnalysisInput::Table(sample_sales_dataset());
        let report = cat.analyze("売上を分析して", Some(&input)).await.unwrap();

        let positions = section_positions(&report);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(report.contains("- 行数: 31"));
        assert!(report.contains("| 売上高 | 31 |"));
        assert!(report.contains("グラフは出力されていません。"));
        assert!(report.contains("これはデータ分析猫からのモック応答です。"));
    }

    #[tokio::test]
    async fn test_charts_written_when_dir_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.analysis.chart_dir = Some(dir.path().to_path_buf());
        ctx.config = Arc::new(config);
        let cat = DataAnalystCat::new(&ctx);

        let input = AnalysisInput::Table(sample_sales_dataset());
        let report = cat.analyze("売上を分析して", Some(&input)).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        assert!(report.contains(".svg"));
    }

    #[tokio::test]
    async fn test_json_input_has_no_stats() {
        let cat = DataAnalystCat::new(&mock_context());
        let input = AnalysisInput::Json(json!({"region": "関東", "sales": 120}));
        let report = cat.analyze("地域別に分析して", Some(&input)).await.unwrap();
        assert!(report.contains("- データ型: 辞書"));
        assert!(report.contains("数値列がないため"));
    }
}
