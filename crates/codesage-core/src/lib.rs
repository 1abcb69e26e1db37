//! codesage-core – the prompt-submission / response-rendering pipeline.
//!
//! The crate is split along the path a single turn takes:
//!
//! 1. [`input`] checks and normalises what the user typed or pasted.
//! 2. [`prompt`] wraps it in the fixed CodeSage instructions.
//! 3. [`upstream`] sends it to the Gemini `generateContent` API and
//!    [`service`] pulls the answer text back out.
//! 4. [`session`] owns the transcript and the request state machine, and
//!    [`render`] turns transcript content into injection-safe HTML.
//!
//! [`backend`] is the seam between the session controller and whatever
//! actually produces text: the HTTP endpoint of `codesage-server`, or a
//! [`service::CodeSageService`] running in-process.

pub mod backend;
pub mod error;
pub mod input;
pub mod prompt;
pub mod render;
pub mod service;
pub mod session;
pub mod upstream;

pub use backend::{Backend, HttpBackend};
pub use error::PipelineError;
pub use prompt::{compose, ComposedPrompt, GenerationConfig, PROMPT_VERSION};
pub use render::{format_message, HtmlTranscript, RenderSink};
pub use service::{CodeSageService, FALLBACK_RESPONSE, WELCOME_MESSAGE};
pub use session::{ChatSession, Phase, RequestId, Role, SessionEvent, SessionLoop, Turn, TurnStatus};
pub use upstream::{GeminiClient, GeminiSettings, GenerateContentRequest, Upstream};
