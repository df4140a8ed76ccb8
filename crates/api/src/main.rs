use anyhow::Context;

use usersync_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    usersync_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let app = usersync_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        allowed_origins = config.allowed_origins.len(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
