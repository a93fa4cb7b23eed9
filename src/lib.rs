//! NekoNexus - 多层级猫猫 Agent 请求分类与委派系统
//!
//! 模块划分：
//! - **agents**: 组织树（マネージャー猫 → 领域管理者 → 专家猫）与节点对话句柄
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 关键词分类器、子节点惰性槽、专家阶段、共享上下文与错误类型
//! - **llm**: 对话后端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: Memory Store（SQLite / 内存）、对话消息、有界历史
//! - **observability**: tracing 初始化
//! - **tools**: 系统指标、检索、示例数据集与图表

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use agents::Dispatcher;
pub use config::{load_config, AppConfig};
pub use core::{AgentContext, AgentError};
