//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `NEKO__*` 覆盖（双下划线表示嵌套，如 `NEKO__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub storage: StorageSection,
    pub dispatcher: DispatcherSection,
    pub analysis: AnalysisSection,
    pub monitor: MonitorSection,
    pub error_handler: ErrorHandlerSection,
}

/// [app] 段：调试开关、拼入后端上下文的历史轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub debug: bool,
    /// 每次调用后端时附带的最近对话轮数（每轮 user + assistant）
    pub history_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "NekoNexus".to_string(),
            debug: false,
            history_turns: 5,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：mock / openai
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// 单次后端调用的等待上限（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "gpt-4o".to_string(),
            base_url: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

/// [storage] 段：Memory Store 后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// sqlite / memory
    pub backend: String,
    pub db_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            db_path: PathBuf::from("nekos_storage.db"),
        }
    }
}

/// [dispatcher] 段：启用的领域（未启用的领域返回「实装中」提示）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherSection {
    pub enabled_domains: Vec<String>,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            enabled_domains: vec!["data".into(), "operation".into(), "system".into()],
        }
    }
}

/// [analysis] 段：图表输出目录（未设置时不写文件）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisSection {
    pub chart_dir: Option<PathBuf>,
}

/// [monitor] 段：轮询间隔、历史长度、停止等待上限、告警阈值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// 启动时即以 interval_secs 开始后台监视
    pub autostart: bool,
    pub interval_secs: u64,
    pub history_len: usize,
    pub stop_timeout_ms: u64,
    pub thresholds: Thresholds,
    /// 系统管理猫自身的指标历史长度
    pub system_history_len: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            autostart: false,
            interval_secs: 60,
            history_len: 1000,
            stop_timeout_ms: 2000,
            thresholds: Thresholds::default(),
            system_history_len: 100,
        }
    }
}

/// 告警阈值
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub process_count_max: usize,
    pub process_count_min: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 85.0,
            disk_percent: 90.0,
            process_count_max: 500,
            process_count_min: 10,
        }
    }
}

/// [error_handler] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErrorHandlerSection {
    pub history_len: usize,
}

impl Default for ErrorHandlerSection {
    fn default() -> Self {
        Self { history_len: 100 }
    }
}

/// 从 config 目录加载配置，环境变量 NEKO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 NEKO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("NEKO")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.monitor.thresholds.cpu_percent, 80.0);
        assert_eq!(cfg.monitor.history_len, 1000);
        assert!(!cfg.monitor.autostart);
        assert_eq!(cfg.error_handler.history_len, 100);
        assert_eq!(cfg.dispatcher.enabled_domains.len(), 3);
        assert!(cfg.analysis.chart_dir.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neko.toml");
        std::fs::write(
            &path,
            "[app]\ndebug = true\n\n[monitor.thresholds]\ncpu_percent = 70.0\n\n[dispatcher]\nenabled_domains = [\"data\"]\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert!(cfg.app.debug);
        assert_eq!(cfg.monitor.thresholds.cpu_percent, 70.0);
        assert_eq!(cfg.monitor.thresholds.memory_percent, 85.0);
        assert_eq!(cfg.dispatcher.enabled_domains, vec!["data".to_string()]);
    }
}
