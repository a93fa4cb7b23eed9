//! 对话后端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：给定消息序列，返回一段回复文本。

use async_trait::async_trait;

use crate::memory::Message;

/// 对话后端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
