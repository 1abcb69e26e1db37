//! Gemini `generateContent` client.
//!
//! [`Upstream`] is the seam the generation service talks to; [`GeminiClient`]
//! is the production implementation over `reqwest`. The response is kept as
//! raw JSON because the only field we rely on is the first candidate's text,
//! see [`extract_text`].

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::PipelineError;
use crate::prompt::{ComposedPrompt, GenerationConfig};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default call-level timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Request body ─────────────────────────────────────────────────────────────

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

impl GenerateContentRequest {
    pub fn new(prompt: &ComposedPrompt, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.text().to_owned(),
                }],
            }],
            generation_config: *config,
        }
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }
}

// ── Response extraction ──────────────────────────────────────────────────────

/// Text of the first part of the first candidate, if present and non-empty.
///
/// Anything else (no candidates, a safety block, a non-string part) means
/// "no usable text" rather than an error.
pub fn extract_text(response: &Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

// ── Upstream seam ────────────────────────────────────────────────────────────

/// Something that can answer a `generateContent` request.
///
/// Returns the decoded JSON body of a successful call.
pub trait Upstream: Send + Sync + 'static {
    fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> impl Future<Output = Result<Value, PipelineError>> + Send;
}

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `…/v1beta/models/{model}:generateContent`, without the key.
    fn endpoint(&self) -> Result<Url, PipelineError> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        Url::parse(&raw)
            .map_err(|e| PipelineError::InvalidConfig(format!("invalid Gemini URL '{raw}': {e}")))
    }
}

// The API key must never end up in logs.
impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, PipelineError> {
        let endpoint = settings.endpoint()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn map_transport_error(&self, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::Timeout(self.settings.timeout)
        } else {
            PipelineError::Network(e.to_string())
        }
    }
}

impl Upstream for GeminiClient {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<Value, PipelineError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.settings.api_key);

        debug!(endpoint = %self.endpoint, model = %self.settings.model, "sending generateContent request");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), response = %body, "Gemini API error");
            return Err(upstream_failure(status, body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| self.map_transport_error(e))
    }
}

fn upstream_failure(status: StatusCode, body: String) -> PipelineError {
    PipelineError::UpstreamFailure {
        message: format!("API request failed with status: {}", status.as_u16()),
        details: body,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
