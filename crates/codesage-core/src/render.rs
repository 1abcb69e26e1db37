//! Transcript rendering.
//!
//! Fenced code blocks become `code-block` elements tagged with their
//! language; everything else is HTML-escaped. No input can produce markup
//! other than the fixed wrapper elements emitted here.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::{Role, Turn, TurnStatus};

/// ```` ```lang\n body ``` ````, non-greedy, `lang` optional.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)\n?(.*?)```").unwrap());

const DEFAULT_LANGUAGE: &str = "text";

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render message content as HTML.
///
/// An unterminated fence (e.g. while a reply is still streaming) is left as
/// escaped text until its closing marker arrives.
pub fn format_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut last = 0;
    for caps in CODE_FENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&escape_html(&text[last..whole.start()]));

        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE);
        let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        out.push_str(&format!(
            "<div class=\"code-block\" data-language=\"{language}\"><pre><code class=\"language-{language}\">{}</code></pre></div>",
            escape_html(code)
        ));
        last = whole.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

/// Receives every transcript mutation made by a
/// [`ChatSession`](crate::session::ChatSession).
///
/// `index` is the turn's position in the transcript; a sink sees each index
/// first when the turn is appended and again whenever it changes.
pub trait RenderSink {
    fn render(&mut self, index: usize, turn: &Turn);
}

impl RenderSink for () {
    fn render(&mut self, _index: usize, _turn: &Turn) {}
}

/// One rendered HTML fragment per turn, kept in transcript order.
#[derive(Debug, Default, Clone)]
pub struct HtmlTranscript {
    fragments: Vec<String>,
}

impl HtmlTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn to_html(&self) -> String {
        self.fragments.concat()
    }
}

impl RenderSink for HtmlTranscript {
    fn render(&mut self, index: usize, turn: &Turn) {
        let html = render_turn(turn);
        if index < self.fragments.len() {
            self.fragments[index] = html;
        } else {
            // Turns are appended in order, so the gap is at most one.
            self.fragments.resize(index, String::new());
            self.fragments.push(html);
        }
    }
}

fn render_turn(turn: &Turn) -> String {
    match turn.role {
        Role::User => format!(
            "<div class=\"message user\">{}</div>",
            format_message(&turn.content)
        ),
        Role::Assistant => {
            let class = match turn.status {
                TurnStatus::Failed => "message bot error",
                TurnStatus::Cancelled => "message bot cancelled",
                _ => "message bot",
            };
            let body = if turn.content.is_empty() && !turn.is_final() {
                "<span class=\"streaming-cursor\"></span>".to_owned()
            } else {
                format_message(&turn.content)
            };
            format!("<div class=\"{class}\">{body}</div>")
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    /// Remove the wrapper markup this module emits, leaving only text.
    fn strip_known_markup(html: &str) -> String {
        let tags = Regex::new(
            r#"<div class="code-block" data-language="\w+"><pre><code class="language-\w+">|</code></pre></div>"#,
        )
        .unwrap();
        tags.replace_all(html, "").into_owned()
    }

    fn assert_no_raw_markup(text: &str) {
        assert!(!text.contains('<'), "raw '<' in {text}");
        assert!(!text.contains('>'), "raw '>' in {text}");
        let entity = Regex::new(r"^&(amp|lt|gt|quot|#39);").unwrap();
        for (i, _) in text.match_indices('&') {
            assert!(entity.is_match(&text[i..]), "raw '&' at {i} in {text}");
        }
    }

    #[test]
    fn js_fence_becomes_tagged_code_element() {
        let html = format_message("```js\nconsole.log(1)\n```");
        assert_eq!(
            html,
            "<div class=\"code-block\" data-language=\"js\"><pre><code class=\"language-js\">console.log(1)</code></pre></div>"
        );
    }

    #[test]
    fn fence_without_language_defaults_to_text() {
        let html = format_message("```\nplain\n```");
        assert!(html.contains("data-language=\"text\""));
        assert!(html.contains("class=\"language-text\""));
    }

    #[test]
    fn code_content_is_escaped() {
        let html = format_message("```html\n<b>\"x\" & 'y'</b>\n```");
        assert!(html.contains("&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"));
    }

    #[test]
    fn text_outside_fences_is_escaped() {
        let html = format_message("<script>alert(1)</script> then ```\nok\n``` & <img>");
        assert!(html.starts_with("&lt;script&gt;alert(1)&lt;/script&gt; then "));
        assert!(html.ends_with(" &amp; &lt;img&gt;"));
    }

    #[test]
    fn rendered_output_has_no_markup_outside_fences() {
        let inputs = [
            "<script>alert('x')</script>",
            "a < b && c > d",
            "```rust\nfn f() -> Vec<u8> { vec![] }\n```\n<p>after</p>",
            "```\nunterminated <b>",
            "```py\none\n``` middle <i>&</i> ```\ntwo\n```",
            "&lt; already escaped &amp;",
            "``` <img src=x onerror=alert(1)>```",
        ];
        for input in inputs {
            assert_no_raw_markup(&strip_known_markup(&format_message(input)));
        }
    }

    #[test]
    fn unterminated_fence_stays_text() {
        let html = format_message("```js\nconst a = 1;");
        assert!(!html.contains("code-block"));
        assert_eq!(html, "```js\nconst a = 1;");
    }

    #[test]
    fn multiple_blocks_keep_order() {
        let html = format_message("first\n```a\n1\n```\nsecond\n```b\n2\n```");
        let a = html.find("language-a").unwrap();
        let b = html.find("language-b").unwrap();
        assert!(a < b);
        assert!(html.contains("second"));
    }

    fn turn(role: Role, content: &str, status: TurnStatus) -> Turn {
        Turn {
            role,
            content: content.to_owned(),
            timestamp: Utc::now(),
            status,
        }
    }

    #[test]
    fn html_transcript_tracks_turns_by_index() {
        let mut sink = HtmlTranscript::new();
        sink.render(0, &turn(Role::User, "<b>hi</b>", TurnStatus::Complete));
        sink.render(1, &turn(Role::Assistant, "", TurnStatus::Pending));
        assert!(sink.fragments()[1].contains("streaming-cursor"));

        sink.render(1, &turn(Role::Assistant, "```js\nx\n```", TurnStatus::Complete));
        assert_eq!(sink.fragments().len(), 2);
        assert_eq!(sink.fragments()[0], "<div class=\"message user\">&lt;b&gt;hi&lt;/b&gt;</div>");
        assert!(sink.fragments()[1].contains("language-js"));
        assert!(!sink.to_html().contains("streaming-cursor"));
    }

    #[test]
    fn pasted_code_in_user_turn_becomes_code_block() {
        let mut session = crate::session::ChatSession::new(HtmlTranscript::new());
        session
            .submit(&crate::input::wrap_pasted("const a = 1 < 2;"))
            .unwrap();
        assert_eq!(
            session.sink().fragments()[0],
            "<div class=\"message user\"><div class=\"code-block\" data-language=\"text\">\
             <pre><code class=\"language-text\">const a = 1 &lt; 2;</code></pre></div></div>"
        );
    }

    #[test]
    fn failed_turn_is_marked() {
        let mut sink = HtmlTranscript::new();
        sink.render(0, &turn(Role::Assistant, "Failed to get response.", TurnStatus::Failed));
        assert!(sink.fragments()[0].starts_with("<div class=\"message bot error\">"));
    }
}
