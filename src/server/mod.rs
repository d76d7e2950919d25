//! HTTP surface of the firmware build service.
//!
//! | Method | Path                  | Response                         |
//! |--------|-----------------------|----------------------------------|
//! | GET    | `/`                   | liveness text                    |
//! | POST   | `/firmware`           | `{"hash": "<id>"}`               |
//! | GET    | `/firmware/:hash`     | build metadata as JSON           |
//! | GET    | `/firmware/:hash/bin` | firmware binary (octet-stream)   |
//!
//! The router is built from an explicit service handle; there is no
//! process-wide route table.

pub mod error;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::FirmwareService;

pub use error::{ApiError, ErrorBody};
pub use routes::BuildResponse;

/// Build the router for `service`
pub fn router(service: Arc<FirmwareService>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/firmware", post(routes::build_firmware))
        .route("/firmware/:hash", get(routes::firmware_info))
        .route("/firmware/:hash/bin", get(routes::firmware_binary))
        .with_state(service)
}

/// Serve `service` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, service: Arc<FirmwareService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, store = %service.store().root().display(), "Firmware service listening");

    axum::serve(
        listener,
        router(service).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("HTTP server failed")?;

    info!("Firmware service stopped");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed
        std::future::pending::<()>().await;
    }
}
