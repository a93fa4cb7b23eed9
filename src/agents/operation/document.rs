//! 文档作成猫：判断文档类型，附上该类型的结构模板后交给后端

use serde::Serialize;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError, KeywordClassifier};

pub const AGENT_ID: &str = "document_cat";

const INSTRUCTIONS: &str = "あなたは「ドキュメント作成猫」という名前の猫猫カンパニーの文書作成AIエージェントです。
メール文案猫とレポート作成猫を統括し、ビジネス文書の作成を担当しています。

目的と対象読者を明確に意識し、正確さ、明確さ、簡潔さを心がけてください。
回答は常に日本語で行い、猫らしい丁寧で文学的な口調（「～にゃ」「～でございますにゃん」）を適度に使用してください。

作成した文書は以下の形式で提示してください：
1. 文書の種類と目的
2. 作成した文書の本文
3. 補足説明や使用上の注意点（該当する場合）";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Email,
    Report,
    Meeting,
    Other,
}

impl DocumentType {
    /// 该类型的结构模板；Other 无模板
    pub fn template(&self) -> Option<&'static str> {
        match self {
            DocumentType::Email => Some(
                "メールテンプレートの基本構造:
- 件名: 簡潔で内容を表すもの
- 宛先: 相手の名前と敬称
- 挨拶: 季節や時候の挨拶（適宜）
- 本文: 要件を明確に
- 締めの言葉: 結びの挨拶
- 署名: 送信者情報",
            ),
            DocumentType::Report => Some(
                "レポートテンプレートの基本構造:
- タイトル: 内容を表す明確なもの
- 概要: 内容の要約（エグゼクティブサマリー）
- 背景: 経緯や目的
- 詳細: 本文（データや事実に基づく記述）
- 結論: 得られた知見や結果
- 推奨事項: 提案や次のステップ",
            ),
            DocumentType::Meeting => Some(
                "会議資料テンプレートの基本構造:
- タイトル: 会議の目的
- 日時・場所: 会議の実施情報
- 参加者: メンバーリスト
- アジェンダ: 議題と時間配分
- 資料本体: 説明内容
- アクションアイテム: 会議後のタスク",
            ),
            DocumentType::Other => None,
        }
    }
}

pub fn classifier() -> KeywordClassifier<DocumentType> {
    KeywordClassifier::new(DocumentType::Other)
        .rule(
            DocumentType::Email,
            &["メール", "email", "mail", "Eメール", "メッセージ", "返信", "送信"],
        )
        .rule(
            DocumentType::Report,
            &["レポート", "report", "報告書", "報告", "レポ", "文書", "ドキュメント"],
        )
        .rule(
            DocumentType::Meeting,
            &["会議", "meeting", "ミーティング", "資料", "議事録", "アジェンダ", "プレゼン"],
        )
}

pub struct DocumentCat {
    conversation: Conversation,
    classifier: KeywordClassifier<DocumentType>,
    debug: bool,
}

impl DocumentCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            classifier: classifier(),
            debug: ctx.debug(),
        }
    }

    pub fn document_type(&self, request: &str) -> DocumentType {
        self.classifier.classify(request)
    }

    /// document_type 为 None 时按请求文本判断
    pub async fn create_document(
        &self,
        request: &str,
        document_type: Option<DocumentType>,
    ) -> Result<String, AgentError> {
        let document_type = document_type.unwrap_or_else(|| self.document_type(request));
        if self.debug {
            tracing::debug!(agent = AGENT_ID, ?document_type, "document type");
        }
        let prompt = match document_type.template() {
            Some(template) => format!("{request}\n\n{template}"),
            None => request.to_string(),
        };
        self.conversation.message(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{mock_context, EchoCountLlm};
    use std::sync::Arc;

    #[test]
    fn test_document_type() {
        let c = classifier();
        assert_eq!(c.classify("取引先への返信メールを書いて"), DocumentType::Email);
        assert_eq!(c.classify("週次の報告書"), DocumentType::Report);
        assert_eq!(c.classify("議事録をまとめて"), DocumentType::Meeting);
        assert_eq!(c.classify("Send an EMAIL"), DocumentType::Email);
        assert_eq!(c.classify("ポエム"), DocumentType::Other);
        // 同分时按 email > report > meeting
        assert_eq!(c.classify("会議のメール"), DocumentType::Email);
    }

    #[tokio::test]
    async fn test_template_appended() {
        let llm = Arc::new(EchoCountLlm::default());
        let mut ctx = mock_context();
        ctx.llm = llm.clone();
        let cat = DocumentCat::new(&ctx);
        cat.create_document("議事録をまとめて", None).await.unwrap();
        assert!(llm
            .last_prompt()
            .starts_with("議事録をまとめて\n\n会議資料テンプレートの基本構造:"));

        cat.create_document("議事録をまとめて", Some(DocumentType::Email))
            .await
            .unwrap();
        assert!(llm.last_prompt().contains("メールテンプレートの基本構造:"));

        cat.create_document("ポエム", None).await.unwrap();
        assert_eq!(llm.last_prompt(), "ポエム");
    }
}
