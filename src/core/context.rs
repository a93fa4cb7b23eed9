//! 共享运行上下文：在构造时注入到每个节点
//!
//! 所有节点共享同一个 Memory Store、后端、指标与检索提供者；子节点由父节点用同一个
//! AgentContext 的克隆构造（内部全部是 Arc）。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{InMemoryStore, MemoryStore, SqliteMemoryStore};
use crate::tools::{MetricsProvider, MockSearchProvider, SearchProvider, SysinfoMetrics};

#[derive(Clone)]
pub struct AgentContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn MemoryStore>,
    pub llm: Arc<dyn LlmClient>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub search: Arc<dyn SearchProvider>,
}

impl AgentContext {
    /// 指标默认取本机 sysinfo，检索默认离线
    pub fn new(config: AppConfig, store: Arc<dyn MemoryStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            llm,
            metrics: Arc::new(SysinfoMetrics::new()),
            search: Arc::new(MockSearchProvider),
        }
    }

    /// 按配置打开存储并创建后端；存储建表失败返回 StorageInit
    pub fn from_config(config: AppConfig) -> Result<Self, AgentError> {
        let store = open_store(&config)?;
        let llm = create_llm_from_config(&config);
        Ok(Self::new(config, store, llm))
    }

    pub fn debug(&self) -> bool {
        self.config.app.debug
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.llm.request_timeout_secs)
    }
}

/// storage.backend = "memory" 时使用进程内存储，其余一律 SQLite
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn MemoryStore>, AgentError> {
    match config.storage.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "sqlite" => Ok(Arc::new(SqliteMemoryStore::open(&config.storage.db_path)?)),
        other => {
            tracing::warn!(backend = other, "unknown storage backend, falling back to sqlite");
            Ok(Arc::new(SqliteMemoryStore::open(&config.storage.db_path)?))
        }
    }
}
