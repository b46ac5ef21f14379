use anyhow::Context;
use server::{AppState, routes};
use services::services::{config::Config, schema_check::check_schema};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _sentry = utils::logging::init("info,server=debug,services=debug,db=debug");

    let config = Config::load().context("loading configuration")?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::build(config).await?;

    match check_schema(&state.db().pool).await {
        Ok(report) if report.is_healthy() => {
            info!(
                migrations = report.migrations_applied,
                latest = ?report.latest_migration,
                "Database schema ready"
            );
        }
        Ok(report) => warn!(missing = ?report.missing_tables, "Database schema incomplete"),
        Err(e) => error!(error = %e, "Could not inspect database schema"),
    }

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
