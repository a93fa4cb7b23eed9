//! 研究猫：检索后交由后端整理

use std::sync::Arc;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError};
use crate::tools::search::{format_results, MAX_SEARCH_RESULTS};
use crate::tools::SearchProvider;

pub const AGENT_ID: &str = "research_cat";

const INSTRUCTIONS: &str = "あなたは「リサーチ猫」という名前の猫猫カンパニーの情報収集AIエージェントです。
Web検索猫と社内DB検索猫を統括し、様々な情報源から情報を収集する役割を担っています。

情報収集の際は、信頼性の高い最新の情報源を優先し、情報源（URL、タイトルなど）を必ず明記してください。
回答は常に日本語で行い、猫らしい好奇心旺盛な口調（「～ニャン」「～かにゃ？」）を適度に使用してください。

収集した情報は以下の形式で整理してください：
1. リクエスト概要
2. 情報源リスト
3. 収集した情報の要約
4. 詳細情報（必要に応じて）
5. 関連する追加情報（該当する場合）";

pub struct ResearchCat {
    conversation: Conversation,
    search: Arc<dyn SearchProvider>,
    debug: bool,
}

impl ResearchCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            search: Arc::clone(&ctx.search),
            debug: ctx.debug(),
        }
    }

    pub async fn collect_information(&self, request: &str) -> Result<String, AgentError> {
        let results = self.search.search(request, MAX_SEARCH_RESULTS);
        if self.debug {
            tracing::debug!(agent = AGENT_ID, hits = results.len(), "search finished");
        }
        let prompt = match format_results(&results) {
            Some(block) => format!("{request}\n\n{block}"),
            None => request.to_string(),
        };
        self.conversation.message(&prompt).await
    }
}
