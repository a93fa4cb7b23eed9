//! 猫猫组织树
//!
//! - **dispatcher**: 顶层マネージャー猫，按领域分派
//! - **data**: データ管理猫（研究猫 / 数据分析猫）
//! - **operation**: 業務遂行猫（文档猫 / 日程猫）
//! - **system**: システム管理猫（监视猫 / 错误对应猫）
//! - **conversation**: 节点与后端、Memory Store 之间的对话句柄

pub mod conversation;
pub mod data;
pub mod dispatcher;
pub mod operation;
pub mod system;

#[cfg(test)]
mod testing;

pub use conversation::Conversation;
pub use data::{DataAnalystCat, DataManagerCat, DataRequestType, ResearchCat};
pub use dispatcher::{Dispatcher, Domain};
pub use operation::{DocumentCat, DocumentType, OperationCat, OperationRequestType, SchedulerCat};
pub use system::{
    Alert, AlertCallback, AlertType, ErrorHandlerCat, ErrorRecord, MonitorCat, PatternMatch,
    Severity, SystemCat, SystemRequestType,
};
