use std::time::Duration;

use thiserror::Error;

/// Errors that can end a single pipeline turn.
///
/// None of these are fatal to a session: the controller records the failure
/// on the affected turn and the next submission starts from a clean state.
/// An upstream reply that is successful but carries no text is *not* an
/// error; it surfaces as `Ok(None)` and is rendered with the fallback reply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Empty or oversize prompt, rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Generation parameters outside their allowed ranges.
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),

    /// The generative API (or the CodeSage endpoint) answered with a
    /// non-success status.
    #[error("upstream request failed: {message}")]
    UpstreamFailure { message: String, details: String },

    /// The connection could not be established or broke mid-request.
    #[error("network error: {0}")]
    Network(String),

    /// The call did not finish within the configured timeout.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl PipelineError {
    /// Text shown to the user in place of (or after) the assistant reply.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(m) => m.clone(),
            PipelineError::InvalidConfig(_) => {
                "CodeSage is misconfigured. Please contact the administrator.".to_owned()
            }
            PipelineError::UpstreamFailure { .. } | PipelineError::Network(_) => {
                "Failed to get response. Please try again.".to_owned()
            }
            PipelineError::Timeout(_) => "The request timed out. Please try again.".to_owned(),
        }
    }

    /// Diagnostic detail suitable for the `details` field of an error body.
    pub fn details(&self) -> String {
        match self {
            PipelineError::UpstreamFailure { message, details } if !details.is_empty() => {
                format!("{message}: {details}")
            }
            PipelineError::UpstreamFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
