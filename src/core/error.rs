//! Agent 错误类型
//!
//! 所有叶子专家与后端调用返回 AgentError；领域管理者在最近一层捕获并转换为面向用户的文本，
//! 只有存储初始化失败（建表失败）允许终止进程。

use std::time::Duration;

use thiserror::Error;

/// Agent 树运行过程中可能出现的错误（后端、存储、指标采集、配置等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 对话后端在限定时间内未返回
    #[error("Backend timeout after {0:?}")]
    BackendTimeout(Duration),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// 存储无法创建表结构（致命，启动阶段）
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    #[error("Metrics collection failed: {0}")]
    Metrics(String),

    #[error("Chart output failed: {0}")]
    Chart(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AgentError {
    /// 错误类别名，用于日志与错误报告
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::BackendTimeout(_) => "BackendTimeout",
            AgentError::BackendUnavailable(_) => "BackendUnavailable",
            AgentError::Storage(_) => "Storage",
            AgentError::StorageInit(_) => "StorageInit",
            AgentError::Metrics(_) => "Metrics",
            AgentError::Chart(_) => "Chart",
            AgentError::ConfigError(_) => "ConfigError",
            AgentError::InvalidInput(_) => "InvalidInput",
        }
    }
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        AgentError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_display() {
        let err = AgentError::BackendTimeout(Duration::from_secs(30));
        assert_eq!(err.kind(), "BackendTimeout");
        assert_eq!(err.to_string(), "Backend timeout after 30s");
        let err = AgentError::BackendTimeout(Duration::from_millis(20));
        assert_eq!(err.to_string(), "Backend timeout after 20ms");
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: AgentError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AgentError::Storage(_)));
    }
}
