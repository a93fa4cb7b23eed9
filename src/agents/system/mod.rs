//! 系统管理猫：监视猫与错误对应猫
//!
//! 分类优先级 error > optimization > security > status，默认 other。
//! - status：监视猫报告
//! - error：以请求文本构造 ErrorRecord 交给错误对应猫
//! - optimization：自身对话，附当前系统状态与自身指标履历的性能推移
//! - security：暂无专家，返回固定说明
//! - other：自身对话，附当前系统状态

pub mod error_handler;
pub mod monitor;
pub mod patterns;

use std::sync::Arc;

use serde::Serialize;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError, ChildSlot, KeywordClassifier};
use crate::memory::BoundedHistory;
use crate::tools::{collect_blocking, Metrics, MetricsProvider};

pub use error_handler::ErrorHandlerCat;
pub use monitor::{Alert, AlertCallback, AlertType, MonitorCat, Severity};
pub use patterns::{ErrorRecord, PatternMatch};

pub const AGENT_ID: &str = "system_cat";

const INSTRUCTIONS: &str = "あなたは「システム管理猫」という名前の猫猫カンパニーのシステム管理AIエージェントです。
監視猫とエラー対応猫を統括し、システム全体の安定稼働を支援する役割を担っています。

パフォーマンス指標（CPU、メモリ、ディスク、ネットワーク）を確認し、問題の予防と早期検知に努めてください。
回答は常に日本語で行い、猫らしい冷静で確実な口調（「～を確認したニャ」「～問題ないにゃん」）を適度に使用してください。

システム状態の報告は以下の形式で整理してください：
1. リクエスト概要
2. 現在のシステム状態
3. 検出された問題点（該当する場合）
4. 対応策または改善提案
5. 今後の監視ポイント";

const SECURITY_FALLBACK: &str = "# 🐱 システム管理猫からの応答

## セキュリティ機能について

申し訳ありませんが、セキュリティ診断機能は現在実装中ですニャ。
現在ご利用いただけるのは以下の機能です：

- システム状態の確認: 「システムの状態を確認して」
- エラー対応: 「エラーが発生したので原因を調べて」
- 最適化の提案: 「システムの最適化方法を教えて」

お手伝いできることがあれば、またお声がけくださいにゃん！（=^・ω・^=）";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRequestType {
    Error,
    Optimization,
    Security,
    Status,
    Other,
}

pub fn classifier() -> KeywordClassifier<SystemRequestType> {
    KeywordClassifier::new(SystemRequestType::Other)
        .rule(
            SystemRequestType::Error,
            &["エラー", "問題", "障害", "バグ", "クラッシュ", "落ちる", "動かない"],
        )
        .rule(
            SystemRequestType::Optimization,
            &["最適化", "改善", "高速化", "効率化", "チューニング", "パフォーマンス向上"],
        )
        .rule(
            SystemRequestType::Security,
            &["セキュリティ", "安全", "脆弱性", "保護", "ウイルス", "ハッキング"],
        )
        .rule(
            SystemRequestType::Status,
            &["状態", "ステータス", "状況", "確認", "監視", "パフォーマンス"],
        )
}

pub struct SystemCat {
    ctx: AgentContext,
    conversation: Conversation,
    classifier: KeywordClassifier<SystemRequestType>,
    metrics: Arc<dyn MetricsProvider>,
    metrics_history: BoundedHistory<Metrics>,
    monitor: ChildSlot<MonitorCat>,
    error_handler: ChildSlot<ErrorHandlerCat>,
}

impl SystemCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            ctx: ctx.clone(),
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            classifier: classifier(),
            metrics: Arc::clone(&ctx.metrics),
            metrics_history: BoundedHistory::new(ctx.config.monitor.system_history_len),
            monitor: ChildSlot::new(),
            error_handler: ChildSlot::new(),
        }
    }

    pub fn ensure_children(&mut self) -> Result<(), AgentError> {
        let ctx = &self.ctx;
        self.monitor.ensure_ready(|| Ok(MonitorCat::new(ctx)))?;
        self.error_handler.ensure_ready(|| Ok(ErrorHandlerCat::new(ctx)))?;
        Ok(())
    }

    /// 监视猫（供调用方启动 / 停止后台监视）
    pub fn monitor_mut(&mut self) -> Result<&mut MonitorCat, AgentError> {
        self.ensure_children()?;
        self.monitor
            .get_mut()
            .ok_or_else(|| AgentError::InvalidInput("monitor_cat not initialized".into()))
    }

    /// `[monitor].autostart` 为真时按配置间隔启动后台监视，告警写入日志；返回是否启动
    pub fn autostart_monitor(&mut self) -> Result<bool, AgentError> {
        if !self.ctx.config.monitor.autostart {
            return Ok(false);
        }
        let monitor = self.monitor_mut()?;
        let interval = monitor.default_interval();
        let callback: AlertCallback = Arc::new(|alert: &Alert| {
            tracing::warn!(
                agent = monitor::AGENT_ID,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                value = alert.value,
                "{}",
                alert.message
            );
        });
        Ok(monitor.start(interval, Some(callback)))
    }

    pub fn metrics_history(&self) -> &BoundedHistory<Metrics> {
        &self.metrics_history
    }

    /// 当前系统状态文本；采集成功时写入自身指标履历
    async fn system_info(&mut self) -> String {
        match collect_blocking(Arc::clone(&self.metrics)).await {
            Ok(metrics) => {
                let text = metrics.describe();
                self.metrics_history.push(metrics);
                text
            }
            Err(e) => {
                tracing::warn!(agent = AGENT_ID, error = %e, "system info unavailable");
                format!("システム情報取得中にエラーが発生しました: {e}")
            }
        }
    }

    fn performance_history(&self) -> String {
        if self.metrics_history.is_empty() {
            return "パフォーマンス推移:\n記録なし".to_string();
        }
        let samples: Vec<Metrics> = self.metrics_history.iter().cloned().collect();
        format!(
            "パフォーマンス推移（直近{}件）:\n{}",
            samples.len(),
            monitor::trend_summary(&samples)
        )
    }

    pub async fn process_system_request(&mut self, request: &str) -> String {
        match self.try_process(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    agent = AGENT_ID,
                    kind = e.kind(),
                    error = %e,
                    "system request failed"
                );
                format!(
                    "# ⚠️ システム管理処理中にエラーが発生しました\n\n\
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
            SystemRequestType::Status => {
                let monitor = self
                    .monitor
                    .get_mut()
                    .ok_or_else(|| AgentError::InvalidInput("monitor_cat not initialized".into()))?;
                monitor.get_monitoring_report("latest").await
            }
            SystemRequestType::Error => {
                let record = ErrorRecord::new("UserReport", request).with_context(AGENT_ID);
                let handler = self.error_handler.get_mut().ok_or_else(|| {
                    AgentError::InvalidInput("error_handler_cat not initialized".into())
                })?;
                handler.handle_error(record).await
            }
            SystemRequestType::Optimization => {
                let info = self.system_info().await;
                let history = self.performance_history();
                self.conversation
                    .message(&format!("{request}\n\n現在のシステム状態:\n{info}\n\n{history}"))
                    .await
            }
            SystemRequestType::Security => Ok(SECURITY_FALLBACK.to_string()),
            SystemRequestType::Other => {
                let info = self.system_info().await;
                self.conversation
                    .message(&format!("{request}\n\n現在のシステム状態:\n{info}"))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{mock_context, EchoCountLlm, FailingLlm};
    use crate::config::AppConfig;
    use std::time::Duration;

    #[test]
    fn test_classification_priority() {
        let c = classifier();
        assert_eq!(c.classify("システムの状態を確認して"), SystemRequestType::Status);
        assert_eq!(c.classify("障害の状況を確認"), SystemRequestType::Status);
        assert_eq!(c.classify("エラーの状況"), SystemRequestType::Error);
        assert_eq!(c.classify("パフォーマンス向上したい"), SystemRequestType::Optimization);
        assert_eq!(c.classify("脆弱性"), SystemRequestType::Security);
        assert_eq!(c.classify("こんにちは"), SystemRequestType::Other);
    }

    #[tokio::test]
    async fn test_status_goes_to_monitor() {
        let mut cat = SystemCat::new(&mock_context());
        let reply = cat.process_system_request("システムの状態を確認して").await;
        assert!(reply.starts_with("## 監視概要"));
    }

    #[tokio::test]
    async fn test_error_goes_to_error_handler() {
        let mut cat = SystemCat::new(&mock_context());
        let reply = cat.process_system_request("サーバーがクラッシュして動かない").await;
        assert!(reply.starts_with("## エラー概要\n\n- タイプ: UserReport"));
        assert!(reply.contains("- コンテキスト: system_cat"));
    }

    #[tokio::test]
    async fn test_optimization_includes_history() {
        let llm = Arc::new(EchoCountLlm::default());
        let mut ctx = mock_context();
        ctx.llm = llm.clone();
        let mut cat = SystemCat::new(&ctx);
        cat.process_system_request("動作を高速化したい").await;
        let prompt = llm.last_prompt();
        assert!(prompt.contains("現在のシステム状態:\nOS: TestOS 1.0"));
        assert!(prompt.contains("パフォーマンス推移（直近1件）"));
        assert_eq!(cat.metrics_history().len(), 1);
    }

    #[tokio::test]
    async fn test_security_is_static() {
        let ctx = mock_context();
        let mut cat = SystemCat::new(&ctx);
        let reply = cat.process_system_request("セキュリティ診断して").await;
        assert_eq!(reply, SECURITY_FALLBACK);
        assert!(ctx.store.get_messages(AGENT_ID, 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_lifecycle_through_manager() {
        let mut cat = SystemCat::new(&mock_context());
        let monitor = cat.monitor_mut().unwrap();
        assert!(monitor.start(Duration::from_millis(10), None));
        assert!(monitor.stop().await);
    }

    #[tokio::test]
    async fn test_autostart_follows_config() {
        let mut cat = SystemCat::new(&mock_context());
        assert!(!cat.autostart_monitor().unwrap());
        assert!(!cat.monitor_mut().unwrap().is_active());

        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.monitor.autostart = true;
        config.monitor.interval_secs = 1;
        ctx.config = Arc::new(config);
        let mut cat = SystemCat::new(&ctx);
        assert!(cat.autostart_monitor().unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let monitor = cat.monitor_mut().unwrap();
        assert!(monitor.is_active());
        assert_eq!(monitor.default_interval(), Duration::from_secs(1));
        assert_eq!(monitor.history().await.len(), 1);
        assert!(monitor.stop().await);
    }

    #[tokio::test]
    async fn test_failure_is_user_message() {
        let mut ctx = mock_context();
        ctx.llm = Arc::new(FailingLlm);
        let mut cat = SystemCat::new(&ctx);
        let reply = cat.process_system_request("こんにちは").await;
        assert!(reply.starts_with("# ⚠️ システム管理処理中にエラーが発生しました"));
    }
}
