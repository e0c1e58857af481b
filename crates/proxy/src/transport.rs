//! MCP transports: stdio, and streamable HTTP served by axum.

use crate::proxy::McpProxy;
use anyhow::Context as _;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::{Value, json};
use std::net::SocketAddr;

/// Serve MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Fails if the MCP handshake fails or the service task aborts.
pub async fn serve_stdio(proxy: McpProxy) -> anyhow::Result<()> {
    tracing::info!("Serving MCP over stdio");
    let service = proxy
        .serve(rmcp::transport::stdio())
        .await
        .context("start stdio MCP service")?;
    let reason = service.waiting().await.context("stdio MCP service")?;
    tracing::info!(reason = ?reason, "stdio MCP service stopped");
    Ok(())
}

/// Axum router: MCP at `/mcp`, liveness at `/health`.
pub fn router(proxy: McpProxy) -> Router {
    let tool_count = proxy.tools().len();
    let mcp = {
        let proxy = proxy.clone();
        StreamableHttpService::new(
            move || Ok(proxy.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        )
    };

    Router::new()
        .route("/health", get(health))
        .with_state(tool_count)
        .nest_service("/mcp", mcp)
}

async fn health(State(tools): State<usize>) -> axum::Json<Value> {
    axum::Json(json!({ "status": "ok", "tools": tools }))
}

/// Serve streamable HTTP on `bind` until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Fails if the address cannot be bound or the server errors.
pub async fn serve_http(proxy: McpProxy, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    let addr = listener.local_addr().context("read bound address")?;
    tracing::info!(addr = %addr, "Serving MCP over streamable HTTP at /mcp");

    axum::serve(listener, router(proxy))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server")?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
