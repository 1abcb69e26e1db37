//! Request / response bodies of the `/codesage` endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for `POST /codesage/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct GenerateRequest {
    /// The error message, stack trace or question to debug.
    #[validate(length(min = 1, max = 8000))]
    pub prompt: String,
}

/// Response body of a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    /// Assistant reply, markdown with fenced code blocks.
    pub response: String,
    /// Always `"success"`.
    pub status: String,
}

impl GenerateResponse {
    pub fn success(response: String) -> Self {
        Self {
            response,
            status: "success".into(),
        }
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Generic, user-facing message.
    pub error: String,
    /// Diagnostic detail.
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

/// A stored chat session. History is not persisted, so lists are empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

/// Response body for `GET /codesage/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub sessions: Vec<SessionSummary>,
}
