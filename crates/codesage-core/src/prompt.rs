//! Prompt Composer.
//!
//! [`compose`] is a pure function of its input and the versioned
//! instruction block below. Bumping [`PROMPT_VERSION`] together with the
//! text changes every future turn; previously rendered turns are untouched.

use serde::Serialize;

use crate::error::PipelineError;

/// Version of [`SYSTEM_INSTRUCTIONS`]. Bump whenever the text changes.
pub const PROMPT_VERSION: u32 = 1;

/// Fixed response-format contract sent ahead of every user prompt.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You are CodeSage, an expert debugging assistant. Your goal is to provide concise, actionable, and comprehensive debugging support.

**Response Format Guidelines:**
1.  **[Critical Fix]** - Provide the immediate, corrected code block. Use clear syntax highlighting.
2.  **[Root Cause]** - Explain the underlying problem concisely (1-2 sentences).
3.  **[Prevention]** - Offer one practical tip to avoid this issue.
4.  **[Analysis]** - Offer a detailed technical breakdown.
5.  Ensure all code blocks are properly formatted with language identifiers (e.g., ```php).";

const USER_HEADER: &str = "**Debug this error/issue:**";
const USER_FOOTER: &str = "Based on the guidelines, provide a detailed, formatted response.";

/// Final text sent upstream: instructions plus the fenced user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    text: String,
    version: u32,
}

impl ComposedPrompt {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// [`PROMPT_VERSION`] of the instructions this prompt was built from.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Build the upstream prompt for `raw_input`.
///
/// The input is embedded verbatim. Length limits are the caller's concern
/// (see [`crate::input::validate_prompt`]); only blank input is rejected.
pub fn compose(raw_input: &str) -> Result<ComposedPrompt, PipelineError> {
    if raw_input.trim().is_empty() {
        return Err(PipelineError::InvalidInput("prompt must not be empty".into()));
    }

    let text = format!(
        "{SYSTEM_INSTRUCTIONS}\n\n{USER_HEADER}\n```\n{raw_input}\n```\n\n{USER_FOOTER}"
    );
    Ok(ComposedPrompt {
        text,
        version: PROMPT_VERSION,
    })
}

/// Upstream sampling parameters, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
}

impl GenerationConfig {
    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
    pub const DEFAULT_TEMPERATURE: f32 = 0.4;
    pub const DEFAULT_TOP_P: f32 = 0.95;

    /// Validate and build a config.
    ///
    /// `max_output_tokens > 0`, `temperature` in `[0, 1]`, `top_p` in `(0, 1]`.
    pub fn new(max_output_tokens: u32, temperature: f32, top_p: f32) -> Result<Self, PipelineError> {
        if max_output_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "maxOutputTokens must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(PipelineError::InvalidConfig(format!(
                "temperature ({temperature}) must be between 0.0 and 1.0"
            )));
        }
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "topP ({top_p}) must be in (0.0, 1.0]"
            )));
        }
        Ok(Self {
            max_output_tokens,
            temperature,
            top_p,
        })
    }

    /// Reference sampling parameters with a deployment-specific token cap.
    pub fn with_max_output_tokens(max_output_tokens: u32) -> Result<Self, PipelineError> {
        Self::new(max_output_tokens, Self::DEFAULT_TEMPERATURE, Self::DEFAULT_TOP_P)
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: Self::DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: Self::DEFAULT_TEMPERATURE,
            top_p: Self::DEFAULT_TOP_P,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
