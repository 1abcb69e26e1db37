//! Server-rendered HTML pages.

use minijinja::{context, Environment};

const CHAT_TEMPLATE: &str = "chat.html";

/// Template environment, built once at startup.
#[derive(Debug)]
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(CHAT_TEMPLATE, include_str!("../templates/chat.html"))?;
        Ok(Self { env })
    }

    /// Render the chat page with `welcome` as the first assistant message.
    pub fn render_chat(&self, welcome: &str, max_chars: usize, soft_limit: usize) -> Result<String, minijinja::Error> {
        self.env.get_template(CHAT_TEMPLATE)?.render(context! {
            title => "CodeSage Debugging Assistant",
            welcome => welcome,
            max_chars => max_chars,
            soft_limit => soft_limit,
            version => env!("CARGO_PKG_VERSION"),
        })
    }
}
