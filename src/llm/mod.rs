//! LLM 层：对话后端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

/// 根据 [llm].provider 创建后端；未知 provider 回退到 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.as_str() {
        "openai" => {
            tracing::info!("Using OpenAI-compatible backend, model={}", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                cfg.llm.api_key.as_deref(),
            ))
        }
        "mock" => Arc::new(MockLlmClient),
        other => {
            tracing::warn!("Unknown llm provider '{}', falling back to mock", other);
            Arc::new(MockLlmClient)
        }
    }
}
