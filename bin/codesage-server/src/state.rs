//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use codesage_core::{CodeSageService, GeminiClient};

use crate::config::Config;
use crate::pages::Pages;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Prompt composer plus the Gemini client behind it.
    pub service: Arc<CodeSageService<GeminiClient>>,
    /// Compiled page templates.
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(config: Config, service: CodeSageService<GeminiClient>) -> Result<Self, minijinja::Error> {
        Ok(Self {
            config: Arc::new(config),
            service: Arc::new(service),
            pages: Arc::new(Pages::new()?),
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::config::test::test_config;

    /// State whose Gemini client talks to `gemini_base_url`.
    pub(crate) fn test_state(gemini_base_url: &str) -> Arc<AppState> {
        let config = Config {
            gemini_base_url: gemini_base_url.to_owned(),
            ..test_config()
        };
        let client = GeminiClient::new(config.gemini_settings()).unwrap();
        let service = CodeSageService::new(client, config.generation_config().unwrap());
        Arc::new(AppState::new(config, service).unwrap())
    }
}
