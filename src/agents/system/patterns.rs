//! 已知错误模式匹配与相似错误检索
//!
//! 规则表按固定顺序求值，返回全部命中的模式；置信度按强 / 弱信号在两个常量间选择。

use serde::{Deserialize, Serialize};

use crate::memory::store::now_timestamp;
use crate::memory::BoundedHistory;

/// 错误记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub traceback: Option<String>,
    /// Unix 秒
    pub timestamp: f64,
    #[serde(default)]
    pub context: Option<String>,
}

impl ErrorRecord {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            traceback: None,
            timestamp: now_timestamp(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// 命中的已知模式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatch {
    pub pattern_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub solution: &'static str,
    pub confidence: f64,
}

struct PatternRule {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    solution: &'static str,
    /// (error_type, 小写 message) -> 是否命中
    matches: fn(&str, &str) -> bool,
    /// 强信号判定
    strong: fn(&str, &str) -> bool,
    strong_confidence: f64,
    weak_confidence: f64,
}

fn rules() -> [PatternRule; 4] {
    [
        PatternRule {
            id: "MEM001",
            name: "メモリ不足エラー",
            description: "プロセスがメモリ制限に達しました。",
            solution: "メモリを増設するか、アプリケーションのメモリ使用量を最適化してください。",
            matches: |t, m| t.contains("MemoryError") || m.contains("memory"),
            strong: |t, _| t.contains("MemoryError"),
            strong_confidence: 0.8,
            weak_confidence: 0.5,
        },
        PatternRule {
            id: "DB001",
            name: "データベース接続エラー",
            description: "データベースへの接続が確立できないか、接続が切断されました。",
            solution: "データベースサーバーの状態を確認し、接続設定を見直してください。",
            matches: |_, m| m.contains("database") || m.contains("sql") || m.contains("connection"),
            strong: |_, m| m.contains("sql"),
            strong_confidence: 0.7,
            weak_confidence: 0.4,
        },
        PatternRule {
            id: "FILE001",
            name: "ファイル操作エラー",
            description: "ファイルが見つからないか、アクセス権限がありません。",
            solution: "ファイルの存在と権限を確認してください。",
            matches: |t, m| t.contains("FileNotFoundError") || m.contains("permission") || m.contains("file"),
            strong: |t, _| t.contains("FileNotFoundError"),
            strong_confidence: 0.75,
            weak_confidence: 0.5,
        },
        PatternRule {
            id: "NET001",
            name: "ネットワーク接続エラー",
            description: "ネットワーク接続に問題があるか、リクエストがタイムアウトしました。",
            solution: "ネットワーク接続を確認し、タイムアウト設定を調整してください。",
            matches: |t, m| t.contains("ConnectionError") || m.contains("timeout") || m.contains("network"),
            strong: |t, _| t.contains("ConnectionError"),
            strong_confidence: 0.7,
            weak_confidence: 0.5,
        },
    ]
}

/// 按规则表顺序返回全部命中的模式
pub fn match_known_patterns(record: &ErrorRecord) -> Vec<PatternMatch> {
    let message = record.message.to_lowercase();
    rules()
        .iter()
        .filter(|rule| (rule.matches)(&record.error_type, &message))
        .map(|rule| PatternMatch {
            pattern_id: rule.id,
            name: rule.name,
            description: rule.description,
            solution: rule.solution,
            confidence: if (rule.strong)(&record.error_type, &message) {
                rule.strong_confidence
            } else {
                rule.weak_confidence
            },
        })
        .collect()
}

/// 相似度：类型相同 +0.5，消息互为子串 +0.3，上下文相同 +0.2
pub fn similarity(a: &ErrorRecord, b: &ErrorRecord) -> f64 {
    let mut score = 0.0;
    if a.error_type == b.error_type {
        score += 0.5;
    }
    if !a.message.is_empty()
        && !b.message.is_empty()
        && (a.message.contains(&b.message) || b.message.contains(&a.message))
    {
        score += 0.3;
    }
    if a.context == b.context {
        score += 0.2;
    }
    score
}

const SIMILARITY_CUTOFF: f64 = 0.5;
const MAX_SIMILAR: usize = 3;

/// 在历史中检索相似错误：得分 > 0.5，按得分降序，至多 3 条
pub fn find_similar<'a>(
    history: &'a BoundedHistory<ErrorRecord>,
    current: &ErrorRecord,
) -> Vec<(&'a ErrorRecord, f64)> {
    let mut similar: Vec<(&ErrorRecord, f64)> = history
        .iter()
        .map(|past| (past, similarity(past, current)))
        .filter(|(_, score)| *score > SIMILARITY_CUTOFF)
        .collect();
    similar.sort_by(|a, b| b.1.total_cmp(&a.1));
    similar.truncate(MAX_SIMILAR);
    similar
}
