//! Input boundary: length limits, submit gating and the paste heuristic.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;

/// Hard limit on prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 8000;

/// Character count above which the input counter shows a warning.
pub const SOFT_LIMIT_CHARS: usize = 3500;

/// Pasted text with more lines than this is treated as code.
const CODE_LINE_THRESHOLD: usize = 5;

static CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^\s*(function|class|import|export|const|let|var)\s+",
        r"[{}()<>;=]",
        r"(?m)^\s*//|/\*|\*/|#",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Trim `input` and check it against the prompt limits.
///
/// Returns the trimmed prompt that should be submitted.
pub fn validate_prompt(input: &str) -> Result<&str, PipelineError> {
    let prompt = input.trim();
    if prompt.is_empty() {
        return Err(PipelineError::InvalidInput("prompt must not be empty".into()));
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(PipelineError::InvalidInput(format!(
            "prompt too long ({chars} characters); maximum is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(prompt)
}

/// Whether the submit action is enabled for `input`.
pub fn submit_enabled(input: &str, busy: bool) -> bool {
    !busy && !input.trim().is_empty()
}

/// Character counter shown next to the input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStatus {
    pub chars: usize,
    pub near_limit: bool,
    pub over_limit: bool,
}

impl InputStatus {
    pub fn of(input: &str) -> Self {
        let chars = input.chars().count();
        Self {
            chars,
            near_limit: chars > SOFT_LIMIT_CHARS,
            over_limit: chars > MAX_PROMPT_CHARS,
        }
    }
}

/// Best-effort guess whether pasted text is source code.
///
/// False positives and negatives are expected; plain prose containing an
/// `=` or a `#` will be treated as code.
pub fn looks_like_code(text: &str) -> bool {
    CODE_PATTERNS.iter().any(|re| re.is_match(text))
        || text.split('\n').count() > CODE_LINE_THRESHOLD
}

/// Wrap pasted text in a bare code fence when it looks like code.
pub fn wrap_pasted(text: &str) -> String {
    if looks_like_code(text) {
        format!("```\n{text}\n```")
    } else {
        text.to_owned()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
