use axum_boot::prelude::*;

mod modules;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting book server...");

    // Knobs come from BOOT_* environment variables.
    let ctx = BootContext::builder().build()?;
    modules::book::declare(&ctx)?;
    modules::chat::declare(&ctx)?;
    ctx.endpoint(Endpoint::get("/health", || async { "up" }))?;
    ctx.on_app_ready(|app| {
        tracing::info!("📚 Routes attached");
        app.fallback(|| async { BaseResp::<()>::error(404, "no such route") })
    });

    let app = Application::builder().context(ctx).build()?;

    let config = app.context().config_service();
    let host = config.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = config.get("PORT").unwrap_or_else(|| "3000".to_string());
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BootError::Internal(format!("cannot bind {addr}: {e}")))?;
    tracing::info!("✅ Server running on http://127.0.0.1:{port}");

    axum::serve(listener, app.into_router())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Error waiting for shutdown signal: {e}");
            }
            tracing::info!("🛑 Initiating graceful shutdown...");
        })
        .await
        .map_err(|e| BootError::Internal(e.to_string()))?;

    tracing::info!("👋 Server stopped");
    Ok(())
}
