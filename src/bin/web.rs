//! Relief HTTP 服务
//!
//! 环境变量:
//! - RELIEF_ADDR: 监听地址 (默认 127.0.0.1:8080)
//! - RELIEF__*: 覆盖配置项，见 config/default.toml
//!
//! 启动: cargo run --bin relief-web --features web

#[cfg(feature = "web")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use relief::config::load_config;
    use relief::core::{create_orchestrator, ShutdownManager};
    use relief::integrations::http::create_router;
    use relief::memory::spawn_session_sweeper;

    relief::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let app_name = cfg.app.name.as_deref().unwrap_or("relief");
    let orchestrator = Arc::new(create_orchestrator(&cfg).context("Failed to create orchestrator")?);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let sweeper = spawn_session_sweeper(
        orchestrator.sessions(),
        Duration::from_secs(cfg.app.sweep_interval_secs),
        shutdown.token(),
    );

    let app = create_router(orchestrator);

    let addr = std::env::var("RELIEF_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(app = app_name, "Relief server listening on http://{}", addr);

    let server_shutdown = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.wait_for_shutdown().await })
        .await?;

    sweeper.await.context("Session sweeper panicked")?;
    Ok(())
}

#[cfg(not(feature = "web"))]
fn main() {
    eprintln!("请使用 --features web 编译: cargo run --bin relief-web --features web");
    std::process::exit(1);
}
