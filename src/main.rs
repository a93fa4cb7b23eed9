//! NekoNexus 无头运行入口
//!
//! 初始化日志与配置，构造 Memory Store 与后端，然后逐行读取 stdin 的用户请求并输出应答。
//! 用法：`nekonexus [config.toml]`，输入 exit / quit 或 Ctrl-C 结束。

use std::path::PathBuf;

use anyhow::Context;
use nekonexus::{load_config, observability, AgentContext, Dispatcher};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    tracing::info!(
        name = %config.app.name,
        provider = %config.llm.provider,
        storage = %config.storage.backend,
        "starting"
    );

    // 存储建表失败属于致命错误
    let ctx = AgentContext::from_config(config).context("Failed to initialize memory store")?;
    let mut dispatcher = Dispatcher::new(ctx);
    dispatcher
        .ensure_children()
        .context("Failed to initialize agents")?;
    if let Some(system) = dispatcher.system_mut() {
        if system.autostart_monitor()? {
            tracing::info!("background monitoring enabled");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all("> ".as_bytes()).await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let request = line.trim();
        if matches!(request, "exit" | "quit") {
            break;
        }

        let response = dispatcher.handle_user_request(request).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n\n").await?;
    }

    if let Some(system) = dispatcher.system_mut() {
        if let Ok(monitor) = system.monitor_mut() {
            monitor.stop().await;
        }
    }
    tracing::info!("bye");
    Ok(())
}
