//! Mock 对话后端（用于测试与离线运行，无需 API）
//!
//! 从 system 指令中取出 Agent 名（「…」内的文字），回显最后一条 User 消息的前 50 个字符。

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// 回显前缀截断长度（字符数）
const ECHO_CHARS: usize = 50;

/// Mock 客户端：固定格式的模拟回复
#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn agent_name(messages: &[Message]) -> String {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| {
                let start = m.content.find('「')? + '「'.len_utf8();
                let end = start + m.content[start..].find('」')?;
                Some(m.content[start..end].to_string())
            })
            .unwrap_or_else(|| "不明".to_string())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        let echoed: String = last_user.chars().take(ECHO_CHARS).collect();

        Ok(format!(
            "これは{}からのモック応答です。実際のAI応答ではありません。\n\n受信したメッセージ: {}...",
            Self::agent_name(messages),
            echoed
        ))
    }
}
