//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use codesage_core::upstream::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use codesage_core::{GeminiSettings, GenerationConfig, PipelineError};

/// Runtime configuration for codesage-server.
///
/// Every field except the API key has a usable default.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (default: `true`).
    pub enable_swagger: bool,

    /// Gemini API key. Empty means every upstream call will be rejected.
    pub gemini_api_key: String,

    /// Gemini model identifier (default: `"gemini-2.0-flash"`).
    pub gemini_model: String,

    /// Gemini API host (default: the public Google endpoint).
    pub gemini_base_url: String,

    /// Upstream `maxOutputTokens` (default: `1000`).
    pub max_output_tokens: u32,

    /// Call-level upstream timeout in seconds (default: `30`).
    pub upstream_timeout_secs: u64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CODESAGE_BIND", "0.0.0.0:3000"),
            log_level: env_or("CODESAGE_LOG", "info"),
            log_json: env_flag("CODESAGE_LOG_JSON", false),
            cors_allowed_origins: std::env::var("CODESAGE_CORS_ORIGINS").ok(),
            enable_swagger: env_flag("CODESAGE_ENABLE_SWAGGER", true),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            max_output_tokens: parse_env("GEMINI_MAX_TOKENS", GenerationConfig::DEFAULT_MAX_OUTPUT_TOKENS),
            upstream_timeout_secs: parse_env("CODESAGE_UPSTREAM_TIMEOUT_SECS", 30),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            base_url: self.gemini_base_url.clone(),
            model: self.gemini_model.clone(),
            api_key: self.gemini_api_key.clone(),
            timeout: self.upstream_timeout(),
        }
    }

    pub fn generation_config(&self) -> Result<GenerationConfig, PipelineError> {
        GenerationConfig::with_max_output_tokens(self.max_output_tokens)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_swagger", &self.enable_swagger)
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
