//! 关键词打分分类器
//!
//! 各节点共用的请求分类组件：每个类别一组关键词，得分为请求中以子串形式出现的关键词个数。
//! - 最高分为 0 时返回节点默认类别
//! - 否则按节点固定的优先级顺序，返回第一个得分等于最高分的类别（同分由优先级决定）
//! - 可选「混合」类别：两个及以上类别同时命中时直接返回该类别
//!
//! 拉丁字母统一转小写后匹配；日文等非拉丁文本仅做子串匹配。关键词互为子串时会重复计分，保持原样。

/// 单个类别的关键词集合
#[derive(Debug, Clone)]
pub struct CategoryRule<C> {
    pub category: C,
    pub keywords: Vec<String>,
}

/// 关键词分类器：rules 的顺序即优先级顺序
#[derive(Debug, Clone)]
pub struct KeywordClassifier<C> {
    rules: Vec<CategoryRule<C>>,
    default: C,
    mixed: Option<C>,
}

impl<C: Copy + PartialEq> KeywordClassifier<C> {
    pub fn new(default: C) -> Self {
        Self {
            rules: Vec::new(),
            default,
            mixed: None,
        }
    }

    /// 追加一个类别（越早追加优先级越高）
    pub fn rule(mut self, category: C, keywords: &[&str]) -> Self {
        self.rules.push(CategoryRule {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        });
        self
    }

    /// 设置混合类别：多个类别同时得分 > 0 时返回
    pub fn mixed(mut self, category: C) -> Self {
        self.mixed = Some(category);
        self
    }

    /// 按优先级顺序返回每个类别的得分
    pub fn scores(&self, request: &str) -> Vec<(C, usize)> {
        let normalized = request.to_lowercase();
        self.rules
            .iter()
            .map(|rule| {
                let score = rule
                    .keywords
                    .iter()
                    .filter(|k| normalized.contains(k.as_str()))
                    .count();
                (rule.category, score)
            })
            .collect()
    }

    pub fn classify(&self, request: &str) -> C {
        let scores = self.scores(request);
        let max_score = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if max_score == 0 {
            return self.default;
        }

        if let Some(mixed) = self.mixed {
            if scores.iter().filter(|(_, s)| *s > 0).count() > 1 {
                return mixed;
            }
        }

        scores
            .into_iter()
            .find(|(_, s)| *s == max_score)
            .map(|(c, _)| c)
            .unwrap_or(self.default)
    }
}
