//! 错误对应猫
//!
//! handle_error：记录日志 → 写入有界错误履历 → 匹配已知模式 → 检索相似错误 → 后端给出对应建议。
//! 报告段落固定为 エラー概要 → 既知パターン照合 → 類似エラー履歴 → 対応提案。

use chrono::{DateTime, Local};

use crate::agents::system::patterns::{find_similar, match_known_patterns, ErrorRecord, PatternMatch};
use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError, SpecialistPhase};
use crate::memory::BoundedHistory;

pub const AGENT_ID: &str = "error_handler_cat";

const INSTRUCTIONS: &str = "あなたは「エラー対応猫」という名前の猫猫カンパニーのエラー対応AIエージェントです。
システムに発生したエラーや問題を分析し、解決策を提案する役割を担っています。

エラーの重要度と影響範囲を判断し、既知の問題パターンや対応履歴と照合して根本原因を分析してください。
回答は常に日本語で行い、猫らしい冷静で解決志向な口調（「～が原因と思われるニャ」「～を試してみるにゃ」）を適度に使用してください。

推奨される対応策は優先順位を付けて提示し、予防策も提案してください。";

const SIMILAR_MESSAGE_CHARS: usize = 50;

pub struct ErrorHandlerCat {
    conversation: Conversation,
    history: BoundedHistory<ErrorRecord>,
    phase: SpecialistPhase,
    /// 最近一次 handle_error 经过的阶段
    last_cycle: Vec<SpecialistPhase>,
}

impl ErrorHandlerCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            history: BoundedHistory::new(ctx.config.error_handler.history_len),
            phase: SpecialistPhase::Idle,
            last_cycle: Vec::new(),
        }
    }

    pub fn phase(&self) -> SpecialistPhase {
        self.phase
    }

    pub fn last_cycle(&self) -> &[SpecialistPhase] {
        &self.last_cycle
    }

    pub fn history(&self) -> &BoundedHistory<ErrorRecord> {
        &self.history
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        self.last_cycle.push(self.phase);
        tracing::debug!(agent = AGENT_ID, phase = ?self.phase, "phase");
    }

    pub async fn handle_error(&mut self, record: ErrorRecord) -> Result<String, AgentError> {
        self.phase = SpecialistPhase::Idle;
        self.last_cycle = vec![SpecialistPhase::Idle];
        let result = self.run(record).await;
        if self.phase != SpecialistPhase::Idle {
            self.phase = SpecialistPhase::Idle;
            self.last_cycle.push(SpecialistPhase::Idle);
        }
        result
    }

    async fn run(&mut self, record: ErrorRecord) -> Result<String, AgentError> {
        self.advance();
        tracing::error!(
            agent = AGENT_ID,
            error_type = %record.error_type,
            message = %record.message,
            context = record.context.as_deref().unwrap_or(""),
            "error reported"
        );
        let similar_summary = format_similar(&find_similar(&self.history, &record));
        self.history.push(record.clone());

        self.advance();
        let patterns = match_known_patterns(&record);
        let patterns_text = format_patterns(&patterns);

        self.advance();
        let overview = format_record(&record);
        let pattern_line = if patterns.is_empty() {
            "既知のエラーパターンとは一致しませんでした。".to_string()
        } else {
            format!("既知のエラーパターンと一致する可能性があります:\n{patterns_text}")
        };
        let prompt = format!(
            "以下のエラー情報を分析し、対応策を提案してください。\n\n\
             {overview}\n\n{pattern_line}\n\n過去のエラー履歴:\n{similar_summary}"
        );
        let suggestion = self.conversation.message(&prompt).await?;
        tracing::info!(
            agent = AGENT_ID,
            error_type = %record.error_type,
            patterns = patterns.len(),
            "error analysis finished"
        );

        self.advance();
        Ok(format!(
            "## エラー概要\n\n{overview}\n\n\
             ## 既知パターン照合\n\n{patterns_text}\n\n\
             ## 類似エラー履歴\n\n{similar_summary}\n\n\
             ## 対応提案\n\n{suggestion}"
        ))
    }
}

pub fn format_timestamp(ts: f64) -> String {
    DateTime::from_timestamp(ts.trunc() as i64, 0)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_record(record: &ErrorRecord) -> String {
    let mut out = format!(
        "- タイプ: {}\n- メッセージ: {}\n- 発生時刻: {}",
        record.error_type,
        record.message,
        format_timestamp(record.timestamp)
    );
    if let Some(context) = record.context.as_deref().filter(|c| !c.is_empty()) {
        out.push_str(&format!("\n- コンテキスト: {context}"));
    }
    if let Some(traceback) = record.traceback.as_deref().filter(|t| !t.is_empty()) {
        out.push_str(&format!("\n\nスタックトレース:\n{traceback}"));
    }
    out
}

fn format_patterns(patterns: &[PatternMatch]) -> String {
    if patterns.is_empty() {
        return "一致するパターンはありません。".to_string();
    }
    patterns
        .iter()
        .map(|p| {
            format!(
                "パターンID: {} (一致度: {:.0}%)\n- 名前: {}\n- 説明: {}\n- 推奨対応: {}",
                p.pattern_id,
                p.confidence * 100.0,
                p.name,
                p.description,
                p.solution
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_similar(similar: &[(&ErrorRecord, f64)]) -> String {
    if similar.is_empty() {
        return "過去に類似したエラーは見つかりませんでした。".to_string();
    }
    similar
        .iter()
        .enumerate()
        .map(|(i, (record, score))| {
            let message: String = record.message.chars().take(SIMILAR_MESSAGE_CHARS).collect();
            format!(
                "{}. エラータイプ: {}\n   メッセージ: {}...\n   発生時刻: {}\n   類似度: {:.0}%",
                i + 1,
                record.error_type,
                message,
                format_timestamp(record.timestamp),
                score * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
