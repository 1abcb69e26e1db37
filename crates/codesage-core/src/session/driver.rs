use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::Backend;
use crate::error::PipelineError;
use crate::render::RenderSink;

use super::{ChatSession, RequestId, SessionEvent, Submission};

/// Drives a [`ChatSession`] against a [`Backend`].
///
/// Every submission runs in its own tokio task which only ever *sends*
/// events; the session itself is mutated solely by whoever owns the loop,
/// through [`SessionLoop::apply`]. Must be used from within a tokio runtime.
pub struct SessionLoop<B, S> {
    session: ChatSession<S>,
    backend: Arc<B>,
    timeout: Duration,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<B: Backend, S: RenderSink> SessionLoop<B, S> {
    pub fn new(backend: Arc<B>, sink: S, timeout: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: ChatSession::new(sink),
            backend,
            timeout,
            events_tx,
            events_rx,
        }
    }

    pub fn session(&self) -> &ChatSession<S> {
        &self.session
    }

    /// Submit `input` and start its request in the background.
    ///
    /// Validation failures return before anything is spawned.
    pub fn submit(&mut self, input: &str) -> Result<RequestId, PipelineError> {
        let submission = self.session.submit(input)?;
        let id = submission.id;
        self.spawn(submission);
        Ok(id)
    }

    pub fn cancel(&mut self) -> bool {
        self.session.cancel()
    }

    /// Wait for the next event from any request task. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub fn apply(&mut self, event: SessionEvent) -> bool {
        self.session.apply(event)
    }

    /// Dispatch events until no request is in flight.
    pub async fn run_until_idle(&mut self) {
        while self.session.is_busy() {
            match self.events_rx.recv().await {
                Some(event) => {
                    self.session.apply(event);
                }
                None => break,
            }
        }
    }

    fn spawn(&self, submission: Submission) {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let Submission { id, prompt, cancel } = submission;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(request = %id, "request task cancelled");
                    return;
                }
                outcome = tokio::time::timeout(timeout, backend.generate(&prompt)) => outcome,
            };
            if cancel.is_cancelled() {
                return;
            }

            let event = match outcome {
                Ok(Ok(text)) => SessionEvent::Completed { id, text },
                Ok(Err(error)) => SessionEvent::Failed { id, error },
                Err(_elapsed) => SessionEvent::Failed {
                    id,
                    error: PipelineError::Timeout(timeout),
                },
            };
            // The receiver only goes away together with the session.
            let _ = events.send(event);
        });
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
