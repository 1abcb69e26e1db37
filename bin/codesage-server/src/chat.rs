//! Interactive terminal client for a running codesage-server.
//!
//! Reads prompts from stdin, one per line. `:paste` starts a multi-line
//! block that ends at `:end`; the block is fenced as code when it looks
//! like code. `:cancel` (or Ctrl-C) abandons the request in flight and
//! `:quit` leaves.

use std::sync::Arc;
use std::time::Duration;

use codesage_core::input::{InputStatus, MAX_PROMPT_CHARS, wrap_pasted};
use codesage_core::{HttpBackend, RenderSink, Role, SessionLoop, Turn, TurnStatus, WELCOME_MESSAGE};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Prints assistant turns as they settle.
struct TerminalSink;

impl RenderSink for TerminalSink {
    fn render(&mut self, _index: usize, turn: &Turn) {
        if !matches!(turn.role, Role::Assistant) {
            return;
        }
        match turn.status {
            TurnStatus::Pending => println!("codesage> thinking..."),
            TurnStatus::Streaming => {}
            TurnStatus::Complete => println!("codesage> {}\n", turn.content),
            TurnStatus::Failed => eprintln!("codesage! {}\n", turn.content),
            TurnStatus::Cancelled => println!("codesage> (cancelled)\n"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Action {
    Submit(String),
    Cancel,
    Quit,
    Nothing,
}

/// Line editor state: `Some` while collecting a `:paste` block.
#[derive(Debug, Default)]
struct LineReader {
    paste: Option<Vec<String>>,
}

impl LineReader {
    fn feed(&mut self, line: &str) -> Action {
        if let Some(block) = &mut self.paste {
            if line.trim() == ":end" {
                let text = block.join("\n");
                self.paste = None;
                return Action::Submit(wrap_pasted(&text));
            }
            block.push(line.to_owned());
            return Action::Nothing;
        }

        match line.trim() {
            ":paste" => {
                self.paste = Some(Vec::new());
                Action::Nothing
            }
            ":cancel" => Action::Cancel,
            ":quit" | ":q" => Action::Quit,
            "" => Action::Nothing,
            _ => Action::Submit(line.to_owned()),
        }
    }

    fn pasting(&self) -> bool {
        self.paste.is_some()
    }
}

enum Input {
    Line(Option<String>),
    Event(codesage_core::SessionEvent),
    Interrupt,
}

/// Run the chat loop against the server at `server_url` until stdin closes
/// or the user quits.
pub async fn run(server_url: &str, timeout: Duration) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(server_url, timeout)?);
    debug!(endpoint = %backend.endpoint(), "chat client ready");
    let mut chat = SessionLoop::new(backend, TerminalSink, timeout);
    let mut reader = LineReader::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{WELCOME_MESSAGE}");
    println!("(:paste starts a multi-line block, :end sends it, :cancel, :quit)\n");

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            Some(event) = chat.next_event() => Input::Event(event),
            _ = tokio::signal::ctrl_c() => Input::Interrupt,
        };

        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) => match reader.feed(&line) {
                Action::Submit(text) => submit(&mut chat, &text),
                Action::Cancel => {
                    if !chat.cancel() {
                        println!("(nothing to cancel)");
                    }
                }
                Action::Quit => break,
                Action::Nothing => {}
            },
            Input::Event(event) => {
                chat.apply(event);
            }
            Input::Interrupt => {
                if reader.pasting() {
                    reader = LineReader::default();
                    println!("(paste discarded)");
                } else if !chat.cancel() {
                    break;
                }
            }
        }
    }

    chat.cancel();
    Ok(())
}

fn submit(chat: &mut SessionLoop<HttpBackend, TerminalSink>, text: &str) {
    let status = InputStatus::of(text.trim());
    if status.near_limit && !status.over_limit {
        println!("({} / {MAX_PROMPT_CHARS} characters)", status.chars);
    }

    let superseding = chat.session().is_busy();
    match chat.submit(text) {
        Ok(id) => {
            debug!(request = %id, superseding, "prompt submitted");
            if superseding {
                println!("(previous request cancelled)");
            }
        }
        Err(e) => eprintln!("codesage! {}\n", e.user_message()),
    }
}
