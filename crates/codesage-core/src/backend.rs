//! Where the session controller gets its text from.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;

/// Produces assistant text for a validated user prompt.
///
/// `Ok(None)` is a successful call that yielded no usable text.
pub trait Backend: Send + Sync + 'static {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, PipelineError>> + Send;
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Talks to `POST /codesage/generate` on a running `codesage-server`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpBackend {
    /// `server_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let raw = format!("{}/codesage/generate", server_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw)
            .map_err(|e| PipelineError::InvalidConfig(format!("invalid server URL '{raw}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_transport_error(&self, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::Timeout(self.timeout)
        } else {
            PipelineError::Network(e.to_string())
        }
    }
}

impl Backend for HttpBackend {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, PipelineError> {
        debug!(endpoint = %self.endpoint, "posting prompt to CodeSage server");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&GenerateBody { prompt })
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if status.is_success() {
            // A body without `response` is the same as an empty reply.
            let reply: Option<GenerateReply> = serde_json::from_slice(&body).ok();
            return Ok(reply
                .and_then(|r| r.response)
                .filter(|text| !text.is_empty()));
        }

        let reply: ErrorReply = serde_json::from_slice(&body).unwrap_or_default();
        Err(classify_failure(status, reply))
    }
}

fn classify_failure(status: StatusCode, reply: ErrorReply) -> PipelineError {
    let details = reply.details.unwrap_or_default();
    if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
        let message = if details.is_empty() {
            reply.error.unwrap_or_else(|| "invalid prompt".to_owned())
        } else {
            details
        };
        return PipelineError::InvalidInput(message);
    }
    PipelineError::UpstreamFailure {
        message: reply
            .error
            .unwrap_or_else(|| format!("server responded with status {}", status.as_u16())),
        details,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
