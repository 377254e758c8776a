//! HTTP surface over the scan store.

mod request_logging;
pub mod response;
pub mod scans;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::AppState;

use request_logging::request_logging_middleware;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/scans",
            get(scans::list_scans_handler).post(scans::create_scan_handler),
        )
        .route(
            "/scans/:id",
            get(scans::get_scan_handler)
                .put(scans::update_scan_handler)
                .delete(scans::delete_scan_handler),
        )
        .layer(from_fn(request_logging_middleware))
        .with_state(state)
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(state: AppState, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("api listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("stopping server");
        })
        .await
        .context("http server failed")
}
