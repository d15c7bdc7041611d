//! REST API handlers grouped by domain.

pub mod history;
pub mod qr;

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::services::generation::GenerationError;
use crate::services::store::ExportError;
use qr_engine::PipelineError;

pub type ApiError = (StatusCode, Json<Value>);

pub const VALIDATION_ERROR: &str = "ValidationError";
pub const EXPORT_ERROR: &str = "ExportError";
pub const NOT_FOUND: &str = "NotFound";
pub const INTERNAL_ERROR: &str = "InternalError";

/// Standard error response.
pub fn err_json(status: u16, kind: &str, message: &str) -> ApiError {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({ "success": false, "error": kind, "message": message })),
    )
}

pub fn validation_error(message: &str) -> ApiError {
    err_json(400, VALIDATION_ERROR, message)
}

pub fn pipeline_error(e: &PipelineError) -> ApiError {
    let status = match e {
        PipelineError::Validation(_) => 400,
        PipelineError::Encoding(_) | PipelineError::LogoProcessing(_) => 422,
        PipelineError::Conversion(_) => 500,
    };
    err_json(status, e.kind(), &e.to_string())
}

pub fn generation_error(e: &GenerationError) -> ApiError {
    match e {
        GenerationError::Pipeline(inner) => pipeline_error(inner),
        other => {
            tracing::error!("Generation failed: {other}");
            err_json(500, INTERNAL_ERROR, &other.to_string())
        }
    }
}

pub fn export_error(e: &ExportError) -> ApiError {
    tracing::error!("Store operation failed: {e}");
    err_json(502, EXPORT_ERROR, &e.to_string())
}
