//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{FirmwareError, StoreError};

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed build request: {0}")]
    MalformedRequest(String),

    #[error("firmware not found: {0}")]
    UnknownId(String),

    #[error(transparent)]
    Firmware(#[from] FirmwareError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownId(_) | ApiError::Firmware(FirmwareError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Firmware(FirmwareError::Build(_))
            | ApiError::Firmware(FirmwareError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ApiError::UnknownId(_) | ApiError::Firmware(FirmwareError::NotFound(_)) => {
                "FIRMWARE_NOT_FOUND"
            }
            ApiError::Firmware(FirmwareError::Build(e)) => e.code(),
            ApiError::Firmware(FirmwareError::Store(StoreError::Json(_))) => "METADATA_CORRUPT",
            ApiError::Firmware(FirmwareError::Store(_)) => "STORE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
