use crate::api::routes;
use crate::app::AppContext;
use crate::errors::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Starts and runs the HTTP server until Ctrl-C
///
/// # Arguments
/// * `ctx` - Application context shared with the handlers
/// * `port` - Port number to listen on for incoming HTTP connections
pub async fn launch_server(ctx: Arc<AppContext>, port: u16) -> Result<()> {
    let app = routes::app(ctx);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
