//! HTTP response mapping for [`AppError`] (SPEC_FULL.md §7).
//!
//! Every error kind the playback pipeline can raise maps onto exactly one
//! HTTP status code and is logged once, here, at the boundary — inner
//! layers only ever construct an `AppError` and propagate it with `?`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::errors::AppError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
        AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
                error!(%self, "request failed");
            }
            _ => warn!(%self, "request rejected"),
        }

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
