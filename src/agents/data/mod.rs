//! 数据管理猫：在研究猫与数据分析猫之间分派
//!
//! 分类为 research_only / analysis_only / combined（两类都命中或都未命中时为 combined）。
//! 请求同时含「売上」与「分析」时才生成示例销售数据交给分析猫。

pub mod analysis;
pub mod research;

use serde::Serialize;

use crate::core::{AgentContext, AgentError, ChildSlot, KeywordClassifier};
use crate::tools::{sample_sales_dataset, AnalysisInput};

pub use analysis::DataAnalystCat;
pub use research::ResearchCat;

pub const AGENT_ID: &str = "data_manager_cat";

const RESPONSE_PREFIX: &str = "# 🐱 データ管理猫からの応答\n\n";
const CLOSING: &str = "（=^・ω・^=）";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRequestType {
    ResearchOnly,
    AnalysisOnly,
    Combined,
}

pub fn classifier() -> KeywordClassifier<DataRequestType> {
    KeywordClassifier::new(DataRequestType::Combined)
        .rule(
            DataRequestType::ResearchOnly,
            &["調査", "検索", "情報収集", "調べて", "探して", "確認して"],
        )
        .rule(
            DataRequestType::AnalysisOnly,
            &["分析", "統計", "相関", "傾向", "グラフ", "可視化", "予測"],
        )
        .mixed(DataRequestType::Combined)
}

fn is_sales_analysis(request: &str) -> bool {
    request.contains("売上") && request.contains("分析")
}

fn sales_analysis_request(request: &str) -> String {
    format!("以下の先月（2025年1月）の売上データを分析してください：\n\n{request}")
}

pub struct DataManagerCat {
    ctx: AgentContext,
    classifier: KeywordClassifier<DataRequestType>,
    research: ChildSlot<ResearchCat>,
    analyst: ChildSlot<DataAnalystCat>,
}

impl DataManagerCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            ctx: ctx.clone(),
            classifier: classifier(),
            research: ChildSlot::new(),
            analyst: ChildSlot::new(),
        }
    }

    /// 子节点幂等初始化
    pub fn ensure_children(&mut self) -> Result<(), AgentError> {
        let ctx = &self.ctx;
        self.research.ensure_ready(|| Ok(ResearchCat::new(ctx)))?;
        self.analyst.ensure_ready(|| Ok(DataAnalystCat::new(ctx)))?;
        Ok(())
    }

    pub fn children_ready(&self) -> bool {
        self.research.is_ready() && self.analyst.is_ready()
    }

    pub async fn process_request(&mut self, request: &str) -> String {
        match self.try_process(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    agent = AGENT_ID,
                    kind = e.kind(),
                    error = %e,
                    "data request failed"
                );
                format!(
                    "# ⚠️ データ分析中にエラーが発生しました\n\n\
                     申し訳ありませんが、データの処理中に問題が発生しましたにゃ。\n\
                     エラー内容: {e}\n\n\
                     別の方法でお試しいただくか、少し後でもう一度お試しくださいにゃ。"
                )
            }
        }
    }

    async fn try_process(&mut self, request: &str) -> Result<String, AgentError> {
        self.ensure_children()?;
        let request_type = self.classifier.classify(request);
        if self.ctx.debug() {
            tracing::debug!(agent = AGENT_ID, ?request_type, "classified");
        }

        match request_type {
            DataRequestType::ResearchOnly => {
                let research = self.research()?;
                let response = research.collect_information(request).await?;
                Ok(format!("{RESPONSE_PREFIX}{response}"))
            }
            DataRequestType::AnalysisOnly if is_sales_analysis(request) => {
                let data = AnalysisInput::Table(sample_sales_dataset());
                let response = self
                    .analyst()?
                    .analyze(&sales_analysis_request(request), Some(&data))
                    .await?;
                Ok(format!(
                    "# 📊 売上データ分析結果\n\n{response}\n\n\
                     何か他にお知りになりたいことがあれば、お気軽にお尋ねくださいにゃ～{CLOSING}"
                ))
            }
            DataRequestType::AnalysisOnly => {
                let response = self.analyst()?.analyze(request, None).await?;
                Ok(format!(
                    "{RESPONSE_PREFIX}{response}\n\nデータ分析猫と協力して分析を行いました{CLOSING}"
                ))
            }
            DataRequestType::Combined if is_sales_analysis(request) => {
                let research = self.research()?.collect_information(request).await?;
                let data = AnalysisInput::Table(sample_sales_dataset());
                let analysis = self
                    .analyst()?
                    .analyze(&sales_analysis_request(request), Some(&data))
                    .await?;
                Ok(format!(
                    "# 📊 売上データ分析結果\n\n\
                     まず情報を収集し、次にデータ分析を行いました。\n\n\
                     ## 収集した情報\n\n{research}\n\n\
                     ## 分析結果\n\n{analysis}\n\n\
                     他に詳しく分析したい点があれば教えてくださいにゃ～{CLOSING}"
                ))
            }
            DataRequestType::Combined => Ok(format!(
                "{RESPONSE_PREFIX}## リクエストについて\n\n\
                 申し訳ありませんが、このタイプのリクエストは現在対応できません。\n\
                 以下のようなデータ分析リクエストをお試しください：\n\n\
                 - 「先月の売上データを分析して」\n\
                 - 「売上高の推移を教えて」\n\
                 - 「商品別の販売数を分析して」\n\n\
                 データ分析に関するご質問があれば、お気軽にお尋ねくださいにゃ～{CLOSING}"
            )),
        }
    }

    fn research(&self) -> Result<&ResearchCat, AgentError> {
        self.research
            .get()
            .ok_or_else(|| AgentError::InvalidInput("research_cat not initialized".into()))
    }

    fn analyst(&self) -> Result<&DataAnalystCat, AgentError> {
        self.analyst
            .get()
            .ok_or_else(|| AgentError::InvalidInput("data_analyst_cat not initialized".into()))
    }
}
