//! 业务执行猫：文档与日程
//!
//! 分类 document / schedule；两类都命中为 combined（先日程后文档，日程结果作为文档的上下文），
//! 都未命中为 general，由本节点自己的对话回答。

pub mod document;
pub mod scheduler;

use serde::Serialize;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError, ChildSlot, KeywordClassifier};

pub use document::{DocumentCat, DocumentType};
pub use scheduler::{SchedulerCat, ScheduleRequestType};

pub const AGENT_ID: &str = "operation_cat";

const INSTRUCTIONS: &str = "あなたは「業務遂行猫」という名前の猫猫カンパニーの業務遂行AIエージェントです。
ドキュメント作成猫とスケジュール管理猫を統括し、業務タスクを管理する役割を担っています。

回答は常に日本語で行い、猫らしい丁寧な口調（「～ですニャ」「～いたしますニャ」）を適度に使用してください。

作成したドキュメントやスケジュール情報は以下の形式で整理してください：
1. リクエスト概要
2. 作成したドキュメントまたはスケジュール情報
3. 補足説明や注意事項
4. 次のステップや推奨事項（該当する場合）";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationRequestType {
    Document,
    Schedule,
    Combined,
    General,
}

pub fn classifier() -> KeywordClassifier<OperationRequestType> {
    KeywordClassifier::new(OperationRequestType::General)
        .rule(
            OperationRequestType::Document,
            &["ドキュメント", "レポート", "文書", "メール", "報告書", "作成", "文章"],
        )
        .rule(
            OperationRequestType::Schedule,
            &["スケジュール", "予定", "会議", "調整", "日程", "カレンダー", "予約"],
        )
        .mixed(OperationRequestType::Combined)
}

pub struct OperationCat {
    ctx: AgentContext,
    conversation: Conversation,
    classifier: KeywordClassifier<OperationRequestType>,
    document: ChildSlot<DocumentCat>,
    scheduler: ChildSlot<SchedulerCat>,
}

impl OperationCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            ctx: ctx.clone(),
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            classifier: classifier(),
            document: ChildSlot::new(),
            scheduler: ChildSlot::new(),
        }
    }

    pub fn ensure_children(&mut self) -> Result<(), AgentError> {
        let ctx = &self.ctx;
        self.document.ensure_ready(|| Ok(DocumentCat::new(ctx)))?;
        self.scheduler.ensure_ready(|| Ok(SchedulerCat::new(ctx)))?;
        Ok(())
    }

    pub async fn process_request(&mut self, request: &str) -> String {
        match self.try_process(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    agent = AGENT_ID,
                    kind = e.kind(),
                    error = %e,
                    "operation request failed"
                );
                format!(
                    "# ⚠️ 業務処理中にエラーが発生しました\n\n\
                     申し訳ありませんが、リクエストの処理中に問題が発生しましたニャ。\n\
                     エラー内容: {e}\n\n\
                     少し時間をおいてから、もう一度お試しくださいニャ。"
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
            OperationRequestType::Document => self.document()?.create_document(request, None).await,
            OperationRequestType::Schedule => {
                self.scheduler()?.process_schedule_request(request).await
            }
            OperationRequestType::Combined => {
                let schedule = self.scheduler()?.process_schedule_request(request).await?;
                let with_context = format!("{request}\n\n現在のスケジュール情報:\n{schedule}");
                let document = self.document()?.create_document(&with_context, None).await?;
                Ok(format!(
                    "## スケジュール\n\n{schedule}\n\n## ドキュメント\n\n{document}"
                ))
            }
            OperationRequestType::General => self.conversation.message(request).await,
        }
    }

    fn document(&self) -> Result<&DocumentCat, AgentError> {
        self.document
            .get()
            .ok_or_else(|| AgentError::InvalidInput("document_cat not initialized".into()))
    }

    fn scheduler(&self) -> Result<&SchedulerCat, AgentError> {
        self.scheduler
            .get()
            .ok_or_else(|| AgentError::InvalidInput("scheduler_cat not initialized".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{mock_context, FailingLlm};
    use std::sync::Arc;

    #[test]
    fn test_classification() {
        let c = classifier();
        assert_eq!(c.classify("報告書を作成して"), OperationRequestType::Document);
        assert_eq!(c.classify("来週の日程を調整して"), OperationRequestType::Schedule);
        assert_eq!(c.classify("会議の報告書"), OperationRequestType::Combined);
        assert_eq!(c.classify("業務の手順"), OperationRequestType::General);
    }

    #[tokio::test]
    async fn test_routes_to_children() {
        let ctx = mock_context();
        let mut cat = OperationCat::new(&ctx);
        let reply = cat.process_request("報告書を作成して").await;
        assert!(reply.starts_with("これはドキュメント作成猫からのモック応答です。"));
        let reply = cat.process_request("来週の日程を調整して").await;
        assert!(reply.starts_with("これはスケジュール管理猫からのモック応答です。"));
        let reply = cat.process_request("業務の手順").await;
        assert!(reply.starts_with("これは業務遂行猫からのモック応答です。"));
    }

    #[tokio::test]
    async fn test_combined_runs_scheduler_then_document() {
        let ctx = mock_context();
        let mut cat = OperationCat::new(&ctx);
        let reply = cat.process_request("会議の報告書").await;
        let schedule_at = reply.find("スケジュール管理猫").unwrap();
        let document_at = reply.find("ドキュメント作成猫").unwrap();
        assert!(schedule_at < document_at);

        let doc_turns = ctx.store.get_messages(document::AGENT_ID, 10, 0).unwrap();
        assert!(doc_turns[0].content.contains("現在のスケジュール情報:\nこれはスケジュール管理猫"));
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let mut ctx = mock_context();
        ctx.llm = Arc::new(FailingLlm);
        let mut cat = OperationCat::new(&ctx);
        let reply = cat.process_request("報告書を作成して").await;
        assert!(reply.starts_with("# ⚠️ 業務処理中にエラーが発生しました"));
    }
}
