//! 顶层调度：マネージャー猫
//!
//! 将用户请求分类为 data / operation / system（同分按此顺序），转交对应的领域管理者；
//! 未命中任何关键词时返回功能说明。领域可在 `[dispatcher].enabled_domains` 中关闭，
//! 关闭的领域返回「現在実装中」说明，其子节点也不会被构造。

use serde::Serialize;

use crate::agents::data::DataManagerCat;
use crate::agents::operation::OperationCat;
use crate::agents::system::SystemCat;
use crate::core::{AgentContext, AgentError, ChildSlot, KeywordClassifier};

pub const AGENT_ID: &str = "manager_cat";

const RESPONSE_HEADER: &str = "# 🐱 マネージャー猫からの応答";

const CAPABILITIES: &str = "- データ分析: 「売上データを分析して」
- グラフ作成: 「売上の推移をグラフにして」
- 統計情報: 「商品別の売上比率を教えて」";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,
    Operation,
    System,
    General,
}

impl Domain {
    /// 配置中使用的领域名
    pub fn config_name(self) -> &'static str {
        match self {
            Domain::Data => "data",
            Domain::Operation => "operation",
            Domain::System => "system",
            Domain::General => "general",
        }
    }

    fn feature_name(self) -> &'static str {
        match self {
            Domain::Data => "データ管理機能",
            Domain::Operation => "業務遂行機能",
            Domain::System => "システム管理機能",
            Domain::General => "お問い合わせ",
        }
    }
}

pub fn classifier() -> KeywordClassifier<Domain> {
    KeywordClassifier::new(Domain::General)
        .rule(
            Domain::Data,
            &[
                "データ", "分析", "統計", "グラフ", "チャート", "可視化", "傾向", "相関", "予測",
                "売上", "レポート", "集計", "情報", "調査", "比較", "分類", "集める", "数字",
                "図表", "トレンド", "資料", "推移", "変化", "調べる", "検索",
            ],
        )
        .rule(
            Domain::Operation,
            &[
                "業務", "オペレーション", "プロセス", "作業", "フロー", "手順", "効率化", "改善",
                "最適化", "プロジェクト", "管理", "実行", "実施", "計画", "スケジュール", "タスク",
                "運用", "設計", "進捗", "状況", "進める", "推進", "実装", "導入",
            ],
        )
        .rule(
            Domain::System,
            &[
                "システム", "サーバー", "ネットワーク", "インフラ", "セキュリティ", "構成", "設定",
                "環境", "デプロイ", "メンテナンス", "保守", "バックアップ", "監視", "通知",
                "アラート", "障害", "復旧", "診断", "テスト", "バグ", "エラー",
            ],
        )
}

/// 未命中任何领域时的功能说明
pub fn general_guide() -> String {
    format!(
        "{RESPONSE_HEADER}\n\n## お問い合わせについて\n\n\
         こんにちは、マネージャー猫です！\n\n\
         現在、以下の機能に対応しています：\n\n{CAPABILITIES}\n\n\
         お手伝いできることがあれば、お気軽にお声がけくださいにゃん！（=^・ω・^=）"
    )
}

/// 被关闭领域的说明
pub fn disabled_domain_notice(domain: Domain) -> String {
    let feature = domain.feature_name();
    format!(
        "{RESPONSE_HEADER}\n\n## {feature}について\n\n\
         申し訳ありませんが、{feature}は現在実装中です。\n\
         現在ご利用いただけるのは以下の機能です：\n\n{CAPABILITIES}\n\n\
         お手伝いできることがあれば、またお声がけくださいにゃん！（=^・ω・^=）"
    )
}

pub struct Dispatcher {
    ctx: AgentContext,
    classifier: KeywordClassifier<Domain>,
    data: ChildSlot<DataManagerCat>,
    operation: ChildSlot<OperationCat>,
    system: ChildSlot<SystemCat>,
}

impl Dispatcher {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            classifier: classifier(),
            data: ChildSlot::new(),
            operation: ChildSlot::new(),
            system: ChildSlot::new(),
        }
    }

    pub fn is_enabled(&self, domain: Domain) -> bool {
        let name = domain.config_name();
        self.ctx
            .config
            .dispatcher
            .enabled_domains
            .iter()
            .any(|d| d == name)
    }

    /// 按需构造已启用领域的管理者；重复调用不会替换已有节点
    pub fn ensure_children(&mut self) -> Result<(), AgentError> {
        let ctx = self.ctx.clone();
        if self.is_enabled(Domain::Data) {
            self.data.ensure_ready(|| Ok(DataManagerCat::new(&ctx)))?;
        }
        if self.is_enabled(Domain::Operation) {
            self.operation.ensure_ready(|| Ok(OperationCat::new(&ctx)))?;
        }
        if self.is_enabled(Domain::System) {
            self.system.ensure_ready(|| Ok(SystemCat::new(&ctx)))?;
        }
        Ok(())
    }

    pub fn system_mut(&mut self) -> Option<&mut SystemCat> {
        self.system.get_mut()
    }

    pub fn classify(&self, request: &str) -> Domain {
        self.classifier.classify(request)
    }

    pub async fn handle_user_request(&mut self, request: &str) -> String {
        if let Err(e) = self.ensure_children() {
            tracing::error!(agent = AGENT_ID, kind = e.kind(), error = %e, "child init failed");
            return format!(
                "{RESPONSE_HEADER}\n\n申し訳ありませんが、処理の準備中に問題が発生しましたにゃ。\n\
                 エラー内容: {e}\n\n少し時間をおいてから、もう一度お試しくださいにゃ。"
            );
        }

        let domain = self.classify(request);
        if self.ctx.debug() {
            tracing::debug!(agent = AGENT_ID, ?domain, "routing request");
        }
        tracing::info!(agent = AGENT_ID, domain = domain.config_name(), "request received");

        match domain {
            Domain::General => general_guide(),
            Domain::Data => match self.data.get_mut() {
                Some(data) => data.process_request(request).await,
                None => disabled_domain_notice(domain),
            },
            Domain::Operation => match self.operation.get_mut() {
                Some(operation) => operation.process_request(request).await,
                None => disabled_domain_notice(domain),
            },
            Domain::System => match self.system.get_mut() {
                Some(system) => system.process_system_request(request).await,
                None => disabled_domain_notice(domain),
            },
        }
    }
}
