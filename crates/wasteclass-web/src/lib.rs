//! Web layer: HTML prediction form, form-encoded predict endpoint, health report.

mod handlers;
mod page;
mod provider;

pub use handlers::{AppState, router};
pub use provider::{ArtifactSource, ModelProvider};

use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler; shutdown only by kill");
        std::future::pending::<()>().await;
    }
}
