//! Generation service: compose, call upstream, extract text.

use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::error::PipelineError;
use crate::prompt::{compose, GenerationConfig};
use crate::upstream::{extract_text, GenerateContentRequest, Upstream};

/// Reply used when the upstream answered successfully but without text.
pub const FALLBACK_RESPONSE: &str = "Sorry, I could not generate a response. Please try again.";

/// Greeting shown when a chat session starts.
pub const WELCOME_MESSAGE: &str =
    "Welcome to CodeSage Debugging Assistant! How can I help you with your code today?";

/// Turns a raw user prompt into assistant text via an [`Upstream`].
#[derive(Debug)]
pub struct CodeSageService<U> {
    upstream: U,
    config: GenerationConfig,
}

impl<U: Upstream> CodeSageService<U> {
    pub fn new(upstream: U, config: GenerationConfig) -> Self {
        Self { upstream, config }
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn welcome_message(&self) -> &'static str {
        WELCOME_MESSAGE
    }

    /// Generate a reply for `raw_prompt`.
    ///
    /// `Ok(None)` means the upstream succeeded but returned no usable text.
    pub async fn generate_text(&self, raw_prompt: &str) -> Result<Option<String>, PipelineError> {
        info!(prompt_chars = raw_prompt.chars().count(), "generating response for prompt");

        let prompt = compose(raw_prompt)?;
        let request = GenerateContentRequest::new(&prompt, &self.config);
        debug!(
            prompt_version = prompt.version(),
            generation_config = ?request.generation_config(),
            "sending payload upstream"
        );

        let response = match self.upstream.generate_content(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "upstream generation failed");
                return Err(e);
            }
        };
        debug!(response = %response, "received upstream response");

        let text = extract_text(&response);
        if text.is_none() {
            warn!(response = %response, "no text in upstream response");
        }
        Ok(text)
    }

    /// Like [`Self::generate_text`], substituting [`FALLBACK_RESPONSE`] for
    /// a reply without text.
    pub async fn generate_response(&self, raw_prompt: &str) -> Result<String, PipelineError> {
        Ok(self
            .generate_text(raw_prompt)
            .await?
            .unwrap_or_else(|| FALLBACK_RESPONSE.to_owned()))
    }
}

impl<U: Upstream> Backend for CodeSageService<U> {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, PipelineError> {
        self.generate_text(prompt).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Upstream that answers every request with a canned result.
    pub(crate) struct StaticUpstream {
        reply: Result<Value, PipelineError>,
        pub(crate) calls: AtomicUsize,
        pub(crate) last_prompt: Mutex<Option<String>>,
    }

    impl StaticUpstream {
        pub(crate) fn ok(reply: Value) -> Self {
            Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        pub(crate) fn err(error: PipelineError) -> Self {
            Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    impl Upstream for StaticUpstream {
        async fn generate_content(
            &self,
            request: &GenerateContentRequest,
        ) -> Result<Value, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = serde_json::to_value(request).unwrap();
            let text = body["contents"][0]["parts"][0]["text"].as_str().map(str::to_owned);
            *self.last_prompt.lock().unwrap() = text;
            self.reply.clone()
        }
    }

    pub(crate) fn candidate(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        let service = CodeSageService::new(StaticUpstream::ok(candidate("Fix: X")), GenerationConfig::default());
        assert_eq!(service.generate_response("boom").await.unwrap(), "Fix: X");
    }

    #[tokio::test]
    async fn sends_composed_prompt_upstream() {
        let service = CodeSageService::new(StaticUpstream::ok(candidate("ok")), GenerationConfig::default());
        service.generate_text("NullPointerException").await.unwrap();
        let sent = service.upstream.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(sent, compose("NullPointerException").unwrap().into_text());
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_text_falls_back_and_warns() {
        let service = CodeSageService::new(StaticUpstream::ok(json!({ "candidates": [] })), GenerationConfig::default());
        assert_eq!(service.generate_text("boom").await.unwrap(), None);
        assert_eq!(service.generate_response("boom").await.unwrap(), FALLBACK_RESPONSE);
        assert!(logs_contain("no text in upstream response"));
    }

    #[tokio::test]
    async fn upstream_failure_is_propagated() {
        let failure = PipelineError::UpstreamFailure {
            message: "API request failed with status: 500".into(),
            details: "internal".into(),
        };
        let service = CodeSageService::new(StaticUpstream::err(failure.clone()), GenerationConfig::default());
        assert_eq!(service.generate_response("boom").await.unwrap_err(), failure);
    }

    #[tokio::test]
    async fn blank_prompt_never_reaches_upstream() {
        let service = CodeSageService::new(StaticUpstream::ok(candidate("ok")), GenerationConfig::default());
        let err = service.generate_response("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(service.upstream.calls.load(Ordering::SeqCst), 0);
    }
}
