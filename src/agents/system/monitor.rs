//! 监视猫：后台轮询指标、阈值告警、监视报告
//!
//! 后台循环为一个 tokio 任务：每个周期采集指标 → 写入有界履历 → 检查阈值 → 对每条告警调用回调。
//! 采集在阻塞线程池中进行，与取消 token 一起 select；停止后循环不再写入履历，也不再触发回调。
//! 停止方最多等待 stop_timeout，超时后放弃等待（不强制终止任务）。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agents::system::error_handler::format_timestamp;
use crate::agents::Conversation;
use crate::config::Thresholds;
use crate::core::{AgentContext, AgentError, SpecialistPhase};
use crate::memory::BoundedHistory;
use crate::tools::{collect_blocking, Metrics, MetricsProvider};

pub const AGENT_ID: &str = "monitor_cat";

const INSTRUCTIONS: &str = "あなたは「監視猫」という名前の猫猫カンパニーのシステム監視AIエージェントです。
システムの状態を常に監視し、異常を検知する役割を担っています。

ベースラインを把握して異常値を適切に判断し、傾向分析から将来的な問題を予測してください。
回答は常に日本語で行い、猫らしい警戒心の強い口調（「～が気になるニャ」「～を見逃さないニャ」）を適度に使用してください。

傾向分析では重要メトリクスの推移と予測、推奨される対応策を示してください。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertType {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Disk,
    Process,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertType::Cpu => "CPU",
            AlertType::Memory => "Memory",
            AlertType::Disk => "Disk",
            AlertType::Process => "Process",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: f64,
    pub severity: Severity,
}

pub type AlertCallback = Arc<dyn Fn(&Alert) + Send + Sync>;

fn percent_severity(value: f64, critical_at: f64) -> Severity {
    if value >= critical_at {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// 按阈值检查一次采集结果
pub fn check_alerts(metrics: &Metrics, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let percent_checks = [
        (AlertType::Cpu, "CPU使用率", metrics.cpu_percent, thresholds.cpu_percent, 90.0),
        (AlertType::Memory, "メモリ使用率", metrics.memory_percent, thresholds.memory_percent, 95.0),
        (AlertType::Disk, "ディスク使用率", metrics.disk_percent, thresholds.disk_percent, 95.0),
    ];
    for (alert_type, label, value, threshold, critical_at) in percent_checks {
        if value > threshold {
            alerts.push(Alert {
                alert_type,
                message: format!("{label}が高すぎます: {value:.1}% (しきい値: {threshold:.1}%)"),
                value,
                threshold,
                timestamp: metrics.timestamp,
                severity: percent_severity(value, critical_at),
            });
        }
    }

    let count = metrics.process_count;
    if count > thresholds.process_count_max {
        alerts.push(Alert {
            alert_type: AlertType::Process,
            message: format!(
                "実行中プロセス数が多すぎます: {count} (しきい値: {})",
                thresholds.process_count_max
            ),
            value: count as f64,
            threshold: thresholds.process_count_max as f64,
            timestamp: metrics.timestamp,
            severity: Severity::Warning,
        });
    }
    if count < thresholds.process_count_min {
        alerts.push(Alert {
            alert_type: AlertType::Process,
            message: format!(
                "実行中プロセス数が少なすぎます: {count} (しきい値: {})",
                thresholds.process_count_min
            ),
            value: count as f64,
            threshold: thresholds.process_count_min as f64,
            timestamp: metrics.timestamp,
            severity: Severity::Warning,
        });
    }
    alerts
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct MonitorCat {
    conversation: Conversation,
    metrics: Arc<dyn MetricsProvider>,
    thresholds: Thresholds,
    history: Arc<Mutex<BoundedHistory<Metrics>>>,
    task: Option<MonitorTask>,
    default_interval: Duration,
    stop_timeout: Duration,
    phase: SpecialistPhase,
    debug: bool,
}

impl MonitorCat {
    pub fn new(ctx: &AgentContext) -> Self {
        let monitor = &ctx.config.monitor;
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            metrics: Arc::clone(&ctx.metrics),
            thresholds: monitor.thresholds,
            history: Arc::new(Mutex::new(BoundedHistory::new(monitor.history_len))),
            task: None,
            default_interval: Duration::from_secs(monitor.interval_secs),
            stop_timeout: Duration::from_millis(monitor.stop_timeout_ms),
            phase: SpecialistPhase::Idle,
            debug: ctx.debug(),
        }
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    pub fn phase(&self) -> SpecialistPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub async fn history(&self) -> Vec<Metrics> {
        self.history.lock().await.iter().cloned().collect()
    }

    /// 启动后台监视；已在运行（或不在 tokio 运行时内）时返回 false
    pub fn start(&mut self, interval: Duration, callback: Option<AlertCallback>) -> bool {
        if self.task.is_some() {
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(agent = AGENT_ID, error = %e, "no tokio runtime, monitor not started");
                return false;
            }
        };

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(monitoring_loop(
            Arc::clone(&self.metrics),
            Arc::clone(&self.history),
            self.thresholds,
            interval,
            callback,
            cancel.clone(),
            self.debug,
        ));
        self.task = Some(MonitorTask { cancel, handle });
        tracing::info!(agent = AGENT_ID, interval_ms = interval.as_millis() as u64, "monitoring started");
        true
    }

    /// 停止后台监视；未在运行时返回 false
    pub async fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.cancel.cancel();
        match tokio::time::timeout(self.stop_timeout, task.handle).await {
            Ok(Ok(())) => tracing::info!(agent = AGENT_ID, "monitoring stopped"),
            Ok(Err(e)) => tracing::warn!(agent = AGENT_ID, error = %e, "monitoring task ended abnormally"),
            Err(_) => tracing::warn!(
                agent = AGENT_ID,
                timeout_ms = self.stop_timeout.as_millis() as u64,
                "monitoring loop did not stop in time, abandoning wait"
            ),
        }
        true
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        tracing::debug!(agent = AGENT_ID, phase = ?self.phase, "phase");
    }

    /// 监视报告：監視概要 → 現在のメトリクス → アラート → 傾向分析
    pub async fn get_monitoring_report(&mut self, time_range: &str) -> Result<String, AgentError> {
        self.phase = SpecialistPhase::Idle;
        let result = self.build_report(time_range).await;
        self.phase = SpecialistPhase::Idle;
        result
    }

    async fn build_report(&mut self, time_range: &str) -> Result<String, AgentError> {
        self.advance();
        let current = collect_blocking(Arc::clone(&self.metrics)).await?;
        let history = self.history().await;

        self.advance();
        let alerts = check_alerts(&current, &self.thresholds);

        self.advance();
        let overview = format!(
            "- 対象期間: {}\n- 監視状態: {}\n- 記録ポイント数: {}\n- 監視開始時刻: {}\n- 最終更新時刻: {}",
            time_range,
            if self.is_active() { "稼働中" } else { "停止中" },
            history.len(),
            history
                .first()
                .map(|m| format_timestamp(m.timestamp))
                .unwrap_or_else(|| "記録なし".to_string()),
            history
                .last()
                .map(|m| format_timestamp(m.timestamp))
                .unwrap_or_else(|| "記録なし".to_string()),
        );
        let metrics_text = format!(
            "- CPU使用率: {:.1}%\n- メモリ使用率: {:.1}%\n- ディスク使用率: {:.1}%\n- 実行中プロセス数: {}\n- ネットワークI/O: 受信={:.2}MB, 送信={:.2}MB",
            current.cpu_percent,
            current.memory_percent,
            current.disk_percent,
            current.process_count,
            current.net_io_recv_mb,
            current.net_io_sent_mb
        );
        let alerts_text = if alerts.is_empty() {
            "現在のアラートはありません。".to_string()
        } else {
            alerts
                .iter()
                .map(|a| format!("- {}: {} (重要度: {})", a.alert_type, a.message, a.severity))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "以下のシステム監視データに基づいて、{time_range}の監視レポートの傾向分析を行ってください。\n\n\
             監視概要:\n{overview}\n\n現在のシステム状態:\n{metrics_text}\n\n\
             現在のアラート:\n{alerts_text}\n\n監視履歴サマリー:\n{}",
            trend_summary(&history)
        );
        let trend = self.conversation.message(&prompt).await?;

        self.advance();
        Ok(format!(
            "## 監視概要\n\n{overview}\n\n\
             ## 現在のメトリクス\n\n{metrics_text}\n\n\
             ## アラート\n\n{alerts_text}\n\n\
             ## 傾向分析\n\n{trend}"
        ))
    }
}

impl Drop for MonitorCat {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.cancel();
        }
    }
}

/// 履历中 CPU / 内存的平均与峰值
pub fn trend_summary(history: &[Metrics]) -> String {
    if history.is_empty() {
        return "記録なし".to_string();
    }
    let n = history.len() as f64;
    let avg = |f: fn(&Metrics) -> f64| history.iter().map(f).sum::<f64>() / n;
    let max = |f: fn(&Metrics) -> f64| history.iter().map(f).fold(f64::MIN, f64::max);
    format!(
        "- CPU使用率: 平均{:.1}%、最大{:.1}%\n- メモリ使用率: 平均{:.1}%、最大{:.1}%\n- ディスク使用率: 平均{:.1}%、最大{:.1}%",
        avg(|m| m.cpu_percent),
        max(|m| m.cpu_percent),
        avg(|m| m.memory_percent),
        max(|m| m.memory_percent),
        avg(|m| m.disk_percent),
        max(|m| m.disk_percent),
    )
}

async fn monitoring_loop(
    metrics: Arc<dyn MetricsProvider>,
    history: Arc<Mutex<BoundedHistory<Metrics>>>,
    thresholds: Thresholds,
    interval: Duration,
    callback: Option<AlertCallback>,
    cancel: CancellationToken,
    debug: bool,
) {
    loop {
        let collected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = collect_blocking(Arc::clone(&metrics)) => result,
        };
        match collected {
            Ok(sample) => {
                let alerts = check_alerts(&sample, &thresholds);
                let recorded = {
                    let mut history = history.lock().await;
                    // 停止方可能已放弃等待，取消后本周期既不记录也不告警
                    if cancel.is_cancelled() {
                        break;
                    }
                    history.push(sample.clone());
                    history.len()
                };
                if let Some(callback) = &callback {
                    for alert in &alerts {
                        callback(alert);
                    }
                }
                if debug && (recorded % 10 == 0 || !alerts.is_empty()) {
                    tracing::debug!(
                        agent = AGENT_ID,
                        cpu = sample.cpu_percent,
                        memory = sample.memory_percent,
                        alerts = alerts.len(),
                        "metrics collected"
                    );
                }
            }
            Err(e) => tracing::warn!(agent = AGENT_ID, error = %e, "metrics collection failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{mock_context, CountingMetrics, SlowMetrics};
    use crate::config::AppConfig;
    use crate::tools::FixedMetrics;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn counting_callback() -> (AlertCallback, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let callback: AlertCallback = Arc::new(move |_: &Alert| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (callback, fired)
    }

    fn sample(cpu: f64, memory: f64, disk: f64, processes: usize) -> Metrics {
        FixedMetrics::new(cpu, memory, disk, processes).collect().unwrap()
    }

    #[test]
    fn test_check_alerts_thresholds_and_severity() {
        let t = Thresholds::default();
        assert!(check_alerts(&sample(80.0, 85.0, 90.0, 500), &t).is_empty());

        let alerts = check_alerts(&sample(85.0, 96.0, 92.0, 5), &t);
        let summary: Vec<_> = alerts.iter().map(|a| (a.alert_type, a.severity)).collect();
        assert_eq!(
            summary,
            vec![
                (AlertType::Cpu, Severity::Warning),
                (AlertType::Memory, Severity::Critical),
                (AlertType::Disk, Severity::Warning),
                (AlertType::Process, Severity::Warning),
            ]
        );
        assert!(alerts[3].message.contains("少なすぎます"));

        let alerts = check_alerts(&sample(90.0, 10.0, 95.0, 600), &t);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].alert_type, AlertType::Disk);
        assert_eq!(alerts[1].severity, Severity::Critical);
        assert!(alerts[2].message.contains("多すぎます"));
    }

    #[tokio::test]
    async fn test_start_stop_semantics() {
        let mut cat = MonitorCat::new(&mock_context());
        assert!(!cat.stop().await);
        assert!(cat.start(Duration::from_millis(10), None));
        assert!(cat.is_active());
        assert!(!cat.start(Duration::from_millis(10), None));
        assert!(cat.stop().await);
        assert!(!cat.is_active());
        assert!(!cat.stop().await);
    }

    #[tokio::test]
    async fn test_no_collection_after_stop() {
        let mut ctx = mock_context();
        ctx.metrics = Arc::new(FixedMetrics::new(95.0, 50.0, 40.0, 120));
        let mut cat = MonitorCat::new(&ctx);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let callback: AlertCallback = Arc::new(move |alert: &Alert| {
            assert_eq!(alert.alert_type, AlertType::Cpu);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(cat.start(Duration::from_millis(5), Some(callback)));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cat.stop().await);

        let collected = cat.history().await.len();
        let alerts = fired.load(Ordering::SeqCst);
        assert!(collected > 0);
        assert_eq!(alerts, collected);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cat.history().await.len(), collected);
        assert_eq!(fired.load(Ordering::SeqCst), alerts);
    }

    #[tokio::test]
    async fn test_history_bounded() {
        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.monitor.history_len = 3;
        ctx.config = Arc::new(config);
        ctx.metrics = Arc::new(CountingMetrics::default());
        let mut cat = MonitorCat::new(&ctx);
        assert!(cat.start(Duration::from_millis(1), None));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cat.stop().await);

        // 最旧的先被淘汰，只留下最近连续的三次
        let cpu: Vec<f64> = cat.history().await.iter().map(|m| m.cpu_percent).collect();
        assert_eq!(cpu.len(), 3);
        assert!(cpu[0] >= 1.0);
        assert_eq!(cpu[1], cpu[0] + 1.0);
        assert_eq!(cpu[2], cpu[1] + 1.0);
    }

    #[tokio::test]
    async fn test_stop_during_slow_collect_discards_cycle() {
        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.monitor.stop_timeout_ms = 50;
        ctx.config = Arc::new(config);
        ctx.metrics = Arc::new(SlowMetrics(Duration::from_millis(300)));
        let mut cat = MonitorCat::new(&ctx);
        let (callback, fired) = counting_callback();

        assert!(cat.start(Duration::from_millis(10), Some(callback)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cat.stop().await);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(cat.history().await.is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_abandons_wait_after_timeout() {
        let mut ctx = mock_context();
        let mut config = AppConfig::default();
        config.monitor.stop_timeout_ms = 50;
        ctx.config = Arc::new(config);
        ctx.metrics = Arc::new(FixedMetrics::new(95.0, 50.0, 40.0, 120));
        let mut cat = MonitorCat::new(&ctx);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        // 回调阻塞住循环，停止方只能放弃等待
        let callback: AlertCallback = Arc::new(move |_: &Alert| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
        });

        assert!(cat.start(Duration::from_secs(1), Some(callback)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = Instant::now();
        assert!(cat.stop().await);
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(!cat.is_active());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(cat.history().await.len(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_outside_runtime_returns_false() {
        let mut cat = MonitorCat::new(&mock_context());
        assert!(!cat.start(Duration::from_millis(10), None));
    }

    #[tokio::test]
    async fn test_report_sections_in_order() {
        let mut ctx = mock_context();
        ctx.metrics = Arc::new(FixedMetrics::new(92.0, 50.0, 40.0, 120));
        let mut cat = MonitorCat::new(&ctx);
        let report = cat.get_monitoring_report("latest").await.unwrap();
        let headings = ["## 監視概要", "## 現在のメトリクス", "## アラート", "## 傾向分析"];
        let positions: Vec<usize> = headings.iter().map(|h| report.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(report.contains("- 監視状態: 停止中"));
        assert!(report.contains("- 記録ポイント数: 0"));
        assert!(report.contains("- CPU: CPU使用率が高すぎます: 92.0% (しきい値: 80.0%) (重要度: critical)"));
        assert_eq!(cat.phase(), SpecialistPhase::Idle);
    }

    #[test]
    fn test_trend_summary() {
        assert_eq!(trend_summary(&[]), "記録なし");
        let text = trend_summary(&[sample(10.0, 20.0, 30.0, 100), sample(30.0, 40.0, 50.0, 100)]);
        assert!(text.starts_with("- CPU使用率: 平均20.0%、最大30.0%"));
    }
}
