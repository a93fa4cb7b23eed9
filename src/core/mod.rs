//! 核心组件：错误类型、关键词分类器、子节点延迟初始化、专家阶段、共享上下文

pub mod classifier;
pub mod context;
pub mod error;
pub mod lazy;
pub mod phase;

pub use classifier::KeywordClassifier;
pub use context::{open_store, AgentContext};
pub use error::AgentError;
pub use lazy::ChildSlot;
pub use phase::SpecialistPhase;
