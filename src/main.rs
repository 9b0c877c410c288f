//! Relief 命令行
//!
//! 入口：初始化日志、加载配置与数据、启动会话清扫，然后逐行读取 stdin 交给编排器。
//! 同一进程内复用一个会话；Ctrl-D 或 Ctrl+C 退出。
//!
//! 启动: cargo run -- [config.toml]

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use relief::config::load_config;
use relief::core::{create_orchestrator, ShutdownManager, ShutdownReason};
use relief::memory::spawn_session_sweeper;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// 在独立线程上阻塞读取行，经 channel 交给异步侧；读到 EOF 或出错后关闭 channel。
/// 线程不受 runtime 管理，Ctrl+C 时主循环无需等它返回即可退出。
fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    relief::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let app_name = cfg.app.name.as_deref().unwrap_or("relief");
    tracing::info!(app = app_name, "Starting CLI");
    let orchestrator = create_orchestrator(&cfg).context("Failed to create orchestrator")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let sweeper = spawn_session_sweeper(
        orchestrator.sessions(),
        Duration::from_secs(cfg.app.sweep_interval_secs),
        shutdown.token(),
    );

    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let mut stdout = tokio::io::stdout();
    let mut session_id: Option<String> = None;

    stdout.write_all(b"Describe what you need (Ctrl-D to quit).\n").await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = shutdown.wait_for_shutdown() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            shutdown.shutdown(ShutdownReason::UserInitiated);
            break;
        };
        let line = line.context("Failed to read stdin")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match orchestrator.handle_message(text, session_id.as_deref()).await {
            Ok(reply) => {
                stdout.write_all(reply.response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                session_id = Some(reply.session_id);
            }
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                stdout.write_all(format!("Error: {}\n", e).as_bytes()).await?;
            }
        }
    }

    shutdown.shutdown(ShutdownReason::UserInitiated);
    sweeper.await.context("Session sweeper panicked")?;
    Ok(())
}
