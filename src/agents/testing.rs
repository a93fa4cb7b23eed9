//! 单元测试共用的上下文与假后端

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::{AgentContext, AgentError};
use crate::llm::{LlmClient, MockLlmClient};
use crate::memory::{InMemoryStore, Message};
use crate::tools::{FixedMetrics, Metrics, MetricsProvider, MockSearchProvider};

/// 内存存储 + Mock 后端 + 健康的固定指标
pub fn mock_context() -> AgentContext {
    let mut config = AppConfig::default();
    config.storage.backend = "memory".to_string();
    AgentContext {
        config: Arc::new(config),
        store: Arc::new(InMemoryStore::new()),
        llm: Arc::new(MockLlmClient),
        metrics: Arc::new(FixedMetrics::healthy()),
        search: Arc::new(MockSearchProvider),
    }
}

/// 记录最近一次调用的消息条数与最后一条 user 内容
#[derive(Default)]
pub struct EchoCountLlm {
    last_len: AtomicUsize,
    last_prompt: std::sync::Mutex<String>,
}

impl EchoCountLlm {
    pub fn last_len(&self) -> usize {
        self.last_len.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.last_prompt.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for EchoCountLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.last_len.store(messages.len(), Ordering::SeqCst);
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = prompt.clone();
        }
        Ok(format!("echo: {prompt}"))
    }
}

pub struct SlowLlm(pub Duration);

#[async_trait]
impl LlmClient for SlowLlm {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        tokio::time::sleep(self.0).await;
        Ok("late".to_string())
    }
}

pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        Err("connection refused".to_string())
    }
}

/// 第 n 次采集返回 cpu_percent = n（从 0 开始）
#[derive(Default)]
pub struct CountingMetrics {
    calls: AtomicUsize,
}

impl MetricsProvider for CountingMetrics {
    fn collect(&self) -> Result<Metrics, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut metrics = FixedMetrics::healthy().collect()?;
        metrics.cpu_percent = n as f64;
        Ok(metrics)
    }
}

/// 每次采集阻塞当前线程一段时间，CPU 固定为 95%
pub struct SlowMetrics(pub Duration);

impl MetricsProvider for SlowMetrics {
    fn collect(&self) -> Result<Metrics, AgentError> {
        std::thread::sleep(self.0);
        FixedMetrics::new(95.0, 50.0, 40.0, 120).collect()
    }
}
