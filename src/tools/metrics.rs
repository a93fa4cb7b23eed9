//! 系统指标采集
//!
//! MetricsProvider 由系统管理猫与监视猫使用；SysinfoMetrics 基于 sysinfo 采集本机 CPU / 内存 / 磁盘 /
//! 网络 / 进程数，FixedMetrics 返回固定值（测试与无权限环境使用）。

use std::sync::{Arc, Mutex};

use serde::Serialize;
use sysinfo::{Disks, Networks, System};

use crate::core::AgentError;
use crate::memory::store::now_timestamp;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// 一次采集的系统指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Unix 秒
    pub timestamp: f64,
    pub os: String,
    pub cpu_percent: f64,
    pub cpu_count: usize,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
    pub disk_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub process_count: usize,
    /// 累计接收（MB）
    pub net_io_recv_mb: f64,
    /// 累计发送（MB）
    pub net_io_sent_mb: f64,
    pub uptime_secs: u64,
}

impl Metrics {
    /// 总体状态：良好 / 注意 / 警告
    pub fn status_rating(&self) -> &'static str {
        if self.cpu_percent > 90.0 || self.memory_percent > 95.0 || self.disk_percent > 95.0 {
            "警告"
        } else if self.cpu_percent > 80.0 || self.memory_percent > 85.0 || self.disk_percent > 90.0
        {
            "注意"
        } else {
            "良好"
        }
    }

    /// 系统状态文本块（拼入后端 prompt 的「現在のシステム状態」）
    pub fn describe(&self) -> String {
        let uptime_days = self.uptime_secs / 86_400;
        let uptime_hours = (self.uptime_secs % 86_400) / 3_600;
        format!(
            "OS: {}\n\
             CPU使用率: {:.1}% (コア数: {})\n\
             メモリ使用率: {:.1}% ({:.1}GB / {:.1}GB)\n\
             ディスク使用率: {:.1}% ({:.1}GB / {:.1}GB)\n\
             実行中プロセス数: {}\n\
             システム稼働時間: {}日 {}時間\n\
             総合状態: {}",
            self.os,
            self.cpu_percent,
            self.cpu_count,
            self.memory_percent,
            self.memory_used_gb,
            self.memory_total_gb,
            self.disk_percent,
            self.disk_used_gb,
            self.disk_total_gb,
            self.process_count,
            uptime_days,
            uptime_hours,
            self.status_rating()
        )
    }
}

/// 指标提供者
pub trait MetricsProvider: Send + Sync {
    fn collect(&self) -> Result<Metrics, AgentError>;
}

/// 在阻塞线程池中采集一次，避免 sysinfo 刷新占用 tokio 工作线程
pub async fn collect_blocking(provider: Arc<dyn MetricsProvider>) -> Result<Metrics, AgentError> {
    tokio::task::spawn_blocking(move || provider.collect())
        .await
        .map_err(|e| AgentError::Metrics(format!("collect task failed: {e}")))?
}

/// 基于 sysinfo 的本机指标采集；CPU 使用率为距上次刷新以来的平均值
pub struct SysinfoMetrics {
    sys: Mutex<System>,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SysinfoMetrics {
    fn collect(&self) -> Result<Metrics, AgentError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| AgentError::Metrics(format!("sysinfo lock poisoned: {e}")))?;
        sys.refresh_cpu();
        sys.refresh_memory();
        sys.refresh_processes();

        let memory_total = sys.total_memory() as f64;
        let memory_used = sys.used_memory() as f64;

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_available) = disks.iter().fold((0u64, 0u64), |(t, a), d| {
            (t + d.total_space(), a + d.available_space())
        });
        let disk_used = disk_total.saturating_sub(disk_available) as f64;

        let networks = Networks::new_with_refreshed_list();
        let (recv, sent) = networks.iter().fold((0u64, 0u64), |(r, s), (_, data)| {
            (r + data.total_received(), s + data.total_transmitted())
        });

        Ok(Metrics {
            timestamp: now_timestamp(),
            os: format!(
                "{} {}",
                System::name().unwrap_or_else(|| "Unknown".to_string()),
                System::os_version().unwrap_or_default()
            ),
            cpu_percent: sys.global_cpu_info().cpu_usage() as f64,
            cpu_count: sys.cpus().len(),
            memory_percent: percent(memory_used, memory_total),
            memory_used_gb: memory_used / GB,
            memory_total_gb: memory_total / GB,
            disk_percent: percent(disk_used, disk_total as f64),
            disk_used_gb: disk_used / GB,
            disk_total_gb: disk_total as f64 / GB,
            process_count: sys.processes().len(),
            net_io_recv_mb: recv as f64 / MB,
            net_io_sent_mb: sent as f64 / MB,
            uptime_secs: System::uptime(),
        })
    }
}

fn percent(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        used / total * 100.0
    }
}

/// 固定指标（时间戳每次采集时刷新）
#[derive(Debug, Clone)]
pub struct FixedMetrics {
    template: Metrics,
}

impl FixedMetrics {
    pub fn new(cpu_percent: f64, memory_percent: f64, disk_percent: f64, process_count: usize) -> Self {
        Self {
            template: Metrics {
                timestamp: 0.0,
                os: "TestOS 1.0".to_string(),
                cpu_percent,
                cpu_count: 8,
                memory_percent,
                memory_used_gb: 16.0 * memory_percent / 100.0,
                memory_total_gb: 16.0,
                disk_percent,
                disk_used_gb: 500.0 * disk_percent / 100.0,
                disk_total_gb: 500.0,
                process_count,
                net_io_recv_mb: 120.5,
                net_io_sent_mb: 80.25,
                uptime_secs: 90_000,
            },
        }
    }

    /// 各项指标都低于默认阈值
    pub fn healthy() -> Self {
        Self::new(35.0, 50.0, 40.0, 120)
    }
}

impl MetricsProvider for FixedMetrics {
    fn collect(&self) -> Result<Metrics, AgentError> {
        Ok(Metrics {
            timestamp: now_timestamp(),
            ..self.template.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rating() {
        let ok = FixedMetrics::healthy().collect().unwrap();
        assert_eq!(ok.status_rating(), "良好");
        let caution = FixedMetrics::new(85.0, 50.0, 40.0, 100).collect().unwrap();
        assert_eq!(caution.status_rating(), "注意");
        let warning = FixedMetrics::new(50.0, 96.0, 40.0, 100).collect().unwrap();
        assert_eq!(warning.status_rating(), "警告");
    }

    #[test]
    fn test_describe_contains_fields() {
        let text = FixedMetrics::healthy().collect().unwrap().describe();
        assert!(text.contains("CPU使用率: 35.0% (コア数: 8)"));
        assert!(text.contains("システム稼働時間: 1日 1時間"));
        assert!(text.ends_with("総合状態: 良好"));
    }

    #[tokio::test]
    async fn test_collect_blocking() {
        let provider: Arc<dyn MetricsProvider> = Arc::new(FixedMetrics::new(12.0, 34.0, 56.0, 78));
        let metrics = collect_blocking(provider).await.unwrap();
        assert_eq!(metrics.cpu_percent, 12.0);
        assert_eq!(metrics.process_count, 78);
    }

    #[test]
    fn test_sysinfo_collect_is_sane() {
        let metrics = SysinfoMetrics::new().collect().unwrap();
        assert!(metrics.cpu_percent >= 0.0);
        assert!((0.0..=100.0).contains(&metrics.memory_percent));
        assert!(metrics.timestamp > 0.0);
    }
}
