//! 检索工具：SearchProvider 抽象 + 离线 Mock 实现
//!
//! 研究猫在调用后端前取至多 5 条结果，拼成「検索結果」块附在请求之后。

use serde::Serialize;

/// 单条检索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// 检索提供者
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}

/// 单次检索返回条数上限
pub const MAX_SEARCH_RESULTS: usize = 5;

/// 离线检索：不访问网络，按查询词生成固定格式的结果
#[derive(Debug, Clone, Default)]
pub struct MockSearchProvider;

impl SearchProvider for MockSearchProvider {
    fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        (1..=max_results.min(MAX_SEARCH_RESULTS))
            .map(|i| SearchResult {
                title: format!("検索結果 {i} for {query}"),
                url: format!("https://example.com/result/{i}"),
                description: format!("これは {query} に関する検索結果 {i} のモック説明です。"),
            })
            .collect()
    }
}

/// 渲染为附在 prompt 末尾的文本块；无结果时返回 None
pub fn format_results(results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let body = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   URL: {}\n   {}", i + 1, r.title, r.url, r.description))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("検索結果:\n{body}"))
}
