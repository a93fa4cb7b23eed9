//! 节点对话句柄
//!
//! 绑定节点 id 与共享 Memory Store：每次 message() 取该节点最近的若干轮对话拼入上下文，
//! 在超时内调用后端，成功后把本轮 user / assistant 追加到存储。
//! 超时返回 BackendTimeout，后端报错返回 BackendUnavailable，均不重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{AgentContext, AgentError};
use crate::llm::LlmClient;
use crate::memory::store::now_timestamp;
use crate::memory::{Message, MemoryStore, Role};

pub struct Conversation {
    agent_id: String,
    instructions: String,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn MemoryStore>,
    history_turns: usize,
    timeout: Duration,
}

impl Conversation {
    pub fn new(agent_id: &str, instructions: impl Into<String>, ctx: &AgentContext) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            instructions: instructions.into(),
            llm: Arc::clone(&ctx.llm),
            store: Arc::clone(&ctx.store),
            history_turns: ctx.config.app.history_turns,
            timeout: ctx.request_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_messages(&self, prompt: &str) -> Result<Vec<Message>, AgentError> {
        let mut messages = vec![Message::system(self.instructions.clone())];
        if self.history_turns > 0 {
            let history = self
                .store
                .get_messages(&self.agent_id, self.history_turns * 2, 0)?;
            messages.extend(
                history
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(Message::from),
            );
        }
        messages.push(Message::user(prompt));
        Ok(messages)
    }

    /// 发送一条消息并返回后端回复
    pub async fn message(&self, prompt: &str) -> Result<String, AgentError> {
        let messages = self.build_messages(prompt)?;
        let start = Instant::now();
        let result = timeout(self.timeout, self.llm.complete(&messages)).await;
        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        tracing::info!(
            agent = %self.agent_id,
            outcome,
            duration_ms = start.elapsed().as_millis() as u64,
            context_messages = messages.len(),
            "backend call"
        );

        let reply = match result {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(AgentError::BackendUnavailable(e)),
            Err(_) => return Err(AgentError::BackendTimeout(self.timeout)),
        };

        let ts = now_timestamp();
        self.store
            .append_message(&self.agent_id, Role::User, prompt, ts)?;
        self.store
            .append_message(&self.agent_id, Role::Assistant, &reply, ts)?;
        Ok(reply)
    }
}
