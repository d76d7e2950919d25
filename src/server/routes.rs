//! Request handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::core::FirmwareService;
use crate::domain::{BuildConfig, BuildId, FirmwareInfo};

use super::error::ApiError;

/// Response to a successful build request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub hash: String,
}

/// GET / - Liveness check
pub(super) async fn index() -> &'static str {
    "It works!"
}

/// POST /firmware - Build firmware for the posted configuration
pub(super) async fn build_firmware(
    State(service): State<Arc<FirmwareService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<BuildConfig>, JsonRejection>,
) -> Result<Json<BuildResponse>, ApiError> {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let span = info_span!("build_request", request_id = %Uuid::new_v4(), client = %client);

    async move {
        let Json(config) = payload.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;
        info!(num_leds = config.num_leds, colors = config.colors.len(), "Build requested");

        let id = service.build(&config, &client).await?;
        Ok::<_, ApiError>(Json(BuildResponse { hash: id.to_string() }))
    }
    .instrument(span)
    .await
}

/// GET /firmware/:hash - Metadata of a stored build
pub(super) async fn firmware_info(
    State(service): State<Arc<FirmwareService>>,
    Path(hash): Path<String>,
) -> Result<Json<FirmwareInfo>, ApiError> {
    let id = parse_id(&hash)?;
    let info = service.info(&id).await?;
    Ok(Json(info))
}

/// GET /firmware/:hash/bin - Download the firmware binary
pub(super) async fn firmware_binary(
    State(service): State<Arc<FirmwareService>>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&hash)?;
    let handle = service.binary(&id).await?;

    let file_name = service.store().binary_file_name();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    info!(build_id = %id, size = handle.size, "Serving firmware binary");

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(handle.size)),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    // Never send more than the declared length, even if the file keeps growing
    let body = Body::from_stream(ReaderStream::new(handle.file.take(handle.size)));

    Ok((headers, body).into_response())
}

/// Identifiers that cannot name an artifact directory are plain misses
fn parse_id(raw: &str) -> Result<BuildId, ApiError> {
    BuildId::parse(raw).map_err(|_| ApiError::UnknownId(raw.to_string()))
}
