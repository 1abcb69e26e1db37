//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`]. Error bodies always have the shape
//! `{ "error": <user-facing message>, "details": <diagnostics> }`.
//!
//! Template failures are logged with full detail but the caller only gets a
//! generic message, since they can carry file paths and template source.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codesage_core::PipelineError;
use thiserror::Error;
use tracing::error;

use crate::schemas::codesage::ErrorResponse;

/// Message returned for every failed generation.
pub const GENERATION_FAILED: &str = "An error occurred while generating the response.";

const VALIDATION_FAILED: &str = "The given data was invalid.";

/// All errors that can occur in the codesage-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body was not valid JSON for the endpoint.
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    /// The request body failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Propagated from the generation pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The chat page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::MalformedBody(e) => (
                e.status(),
                ErrorResponse::new(VALIDATION_FAILED, e.body_text()),
            ),
            ServerError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(VALIDATION_FAILED, e.to_string()),
            ),
            ServerError::Pipeline(PipelineError::InvalidInput(m)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(VALIDATION_FAILED, m.clone()),
            ),
            ServerError::Pipeline(e) => {
                error!(error = %e, "error in generate");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(GENERATION_FAILED, e.details()),
                )
            }
            ServerError::Template(e) => {
                error!(error = ?e, "failed to render page");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal server error", String::new()),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
