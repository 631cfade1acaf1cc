// apps/a4s-core/src/main.rs
// Purpose: Entry point. Loads configuration, wires C1-C6, starts the server.
// Architecture: Application Boot
// Dependencies: Axum, Tower, Tokio

use std::sync::Arc;

use a4s_core::app_state::AppState;
use a4s_core::config::Settings;
use a4s_core::server::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("a4s_core=debug".parse().unwrap())
                .add_directive("tower_http=trace".parse().unwrap()),
        )
        .init();

    tracing::info!("Initializing A4S control plane...");

    let settings = Settings::load()?;
    let port = settings.port;
    let state = Arc::new(AppState::new(settings).await?);

    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to port");

    tracing::info!("A4S control plane listening on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    state.shutdown().await;
    Ok(())
}
