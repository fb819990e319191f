//! Narrator Gateway - 章节流式代理服务
//!
//! 宿主应用与生成服务之间的代理，配置见 `[gateway]` 段

use std::sync::Arc;

use narrator::config::{load_config, print_gateway_config};
use narrator::gateway::{build_router, GatewayState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let log_filter = format!(
        "{},narrator={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Narrator Gateway - chapter streaming proxy");
    print_gateway_config(&config);

    tokio::fs::create_dir_all(&config.gateway.temp_dir).await?;

    let state = GatewayState::from_config(&config.gateway)?;
    let router = build_router(Arc::new(state));

    let addr = config.gateway.addr();
    tracing::info!("Starting gateway on {} (with graceful shutdown)", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}
