//! Chat Session Controller.
//!
//! [`ChatSession`] is a synchronous state machine: [`ChatSession::submit`]
//! starts a turn and hands back a [`Submission`] describing the request to
//! make, and [`ChatSession::apply`] feeds the outcome back in as a
//! [`SessionEvent`]. [`SessionLoop`] wires the two together with one tokio
//! task per request and a single dispatcher that owns the session.
//!
//! ```text
//!   Idle | Error ──submit──▶ Submitting ──data──▶ StreamingResponse ──done──▶ Idle
//!        ▲                       │                        │
//!        └──────── cancel ◀──────┴────────────────────────┘
//!   any busy state ──failure / timeout──▶ Error
//! ```

mod driver;

pub use driver::SessionLoop;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::input;
use crate::render::RenderSink;
use crate::service::FALLBACK_RESPONSE;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How far along a turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Placeholder waiting for the first data.
    Pending,
    /// Partial content has arrived.
    Streaming,
    Complete,
    /// Superseded or cancelled; content is whatever had arrived.
    Cancelled,
    /// Finalized with an error message.
    Failed,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: TurnStatus,
}

impl Turn {
    fn new(role: Role, content: String, status: TurnStatus) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            status,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self.status, TurnStatus::Pending | TurnStatus::Streaming)
    }
}

/// Handle of one upstream request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Submitting,
    StreamingResponse,
    Error,
}

/// A request the caller must now perform.
///
/// The call should be abandoned as soon as `cancel` fires; results that
/// arrive afterwards are discarded by [`ChatSession::apply`] anyway.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: RequestId,
    pub prompt: String,
    pub cancel: CancellationToken,
}

/// Outcome of (part of) a request, fed back through [`ChatSession::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Partial text to append to the reply.
    Chunk { id: RequestId, text: String },
    /// The request finished. `text` replaces any partial content; `None`
    /// means the upstream produced no usable text.
    Completed { id: RequestId, text: Option<String> },
    Failed { id: RequestId, error: PipelineError },
}

impl SessionEvent {
    pub fn id(&self) -> RequestId {
        match self {
            SessionEvent::Chunk { id, .. }
            | SessionEvent::Completed { id, .. }
            | SessionEvent::Failed { id, .. } => *id,
        }
    }
}

#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    turn: usize,
    cancel: CancellationToken,
}

/// One logical conversation.
///
/// Owns the transcript exclusively; callers only ever see `&[Turn]`.
/// `is_busy()` holds exactly while a request is active.
pub struct ChatSession<S> {
    transcript: Vec<Turn>,
    phase: Phase,
    active: Option<ActiveRequest>,
    next_request: u64,
    cancellations: u64,
    sink: S,
}

impl<S: RenderSink> ChatSession<S> {
    pub fn new(sink: S) -> Self {
        Self {
            transcript: Vec::new(),
            phase: Phase::Idle,
            active: None,
            next_request: 1,
            cancellations: 0,
            sink,
        }
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Number of requests cancelled over the session's lifetime.
    pub fn cancellations(&self) -> u64 {
        self.cancellations
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether a submit control should be enabled for `input`.
    pub fn can_submit(&self, input: &str) -> bool {
        input::submit_enabled(input, self.is_busy())
    }

    /// Start a new turn for `input`.
    ///
    /// Invalid input is rejected without touching the transcript. A request
    /// that is still in flight is cancelled first, keeping its partial reply.
    pub fn submit(&mut self, input: &str) -> Result<Submission, PipelineError> {
        let prompt = input::validate_prompt(input)?.to_owned();

        if self.cancel() {
            debug!("previous request superseded by new submission");
        }

        self.push(Turn::new(Role::User, prompt.clone(), TurnStatus::Complete));
        let turn = self.push(Turn::new(Role::Assistant, String::new(), TurnStatus::Pending));

        let id = RequestId(self.next_request);
        self.next_request += 1;
        let cancel = CancellationToken::new();
        self.active = Some(ActiveRequest {
            id,
            turn,
            cancel: cancel.clone(),
        });
        self.phase = Phase::Submitting;
        info!(request = %id, prompt_chars = prompt.chars().count(), "prompt submitted");

        Ok(Submission { id, prompt, cancel })
    }

    /// Cancel the in-flight request, if any.
    ///
    /// Its assistant turn is finalized with the partial content received so
    /// far. Returns `false` when nothing was in flight.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        self.cancellations += 1;
        self.finalize(active.turn, TurnStatus::Cancelled);
        self.phase = Phase::Idle;
        info!(request = %active.id, "request cancelled");
        true
    }

    /// Apply a request outcome. Events for anything but the active request
    /// are dropped and `false` is returned.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let Some(active) = self.active.as_ref().filter(|a| a.id == event.id()) else {
            debug!(request = %event.id(), "discarding event for inactive request");
            return false;
        };
        let turn = active.turn;

        match event {
            SessionEvent::Chunk { text, .. } => {
                self.phase = Phase::StreamingResponse;
                let t = &mut self.transcript[turn];
                t.content.push_str(&text);
                t.status = TurnStatus::Streaming;
                self.notify(turn);
            }
            SessionEvent::Completed { id, text } => {
                // A full payload counts as data arrival before completion.
                self.phase = Phase::StreamingResponse;
                let t = &mut self.transcript[turn];
                match text {
                    Some(text) => t.content = text,
                    None if t.content.is_empty() => {
                        warn!(request = %id, "no usable text in reply; using fallback");
                        t.content = FALLBACK_RESPONSE.to_owned();
                    }
                    None => {}
                }
                self.active = None;
                self.finalize(turn, TurnStatus::Complete);
                self.phase = Phase::Idle;
                info!(request = %id, reply_chars = self.transcript[turn].content.chars().count(), "reply complete");
            }
            SessionEvent::Failed { id, error } => {
                warn!(request = %id, error = %error, "request failed");
                let message = error.user_message();
                let t = &mut self.transcript[turn];
                if t.content.is_empty() {
                    t.content = message;
                } else {
                    t.content.push_str("\n\n");
                    t.content.push_str(&message);
                }
                self.active = None;
                self.finalize(turn, TurnStatus::Failed);
                self.phase = Phase::Error;
            }
        }
        true
    }

    fn push(&mut self, turn: Turn) -> usize {
        self.transcript.push(turn);
        let index = self.transcript.len() - 1;
        self.notify(index);
        index
    }

    fn finalize(&mut self, index: usize, status: TurnStatus) {
        self.transcript[index].status = status;
        self.notify(index);
    }

    fn notify(&mut self, index: usize) {
        self.sink.render(index, &self.transcript[index]);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
