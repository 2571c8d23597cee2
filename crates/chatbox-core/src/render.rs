//! Sanitize pipeline: untrusted text and markdown to safe HTML
//!
//! Assistant replies go through pulldown-cmark with raw HTML neutralized and
//! code fences highlighted. Everything else is escaped verbatim.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::highlight::highlight_html;
use crate::state::ChatRole;

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// ANSI CSI / OSC sequences and lone escapes
static ESCAPE_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]?")
        .expect("escape sequence pattern is valid")
});

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Render message content through the pipeline for its role
pub fn render(role: ChatRole, text: &str) -> String {
    match role {
        ChatRole::Assistant => render_markdown(text),
        ChatRole::User => render_plain(text),
    }
}

/// Escape-only rendering: line breaks are preserved, nothing is interpreted
pub fn render_plain(text: &str) -> String {
    let body = text
        .lines()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br />\n");
    format!("<p>{}</p>\n", body)
}

fn is_safe_url(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("")
    }
}

/// Markdown to sanitized HTML
///
/// Raw HTML (blocks and inline) is emitted as escaped text, soft breaks
/// become `<br />`, dangerous link schemes are dropped and fenced code is
/// highlighted.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events: Vec<Event> = Vec::new();
    let mut code_block: Option<(String, String)> = None;

    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, code)) = code_block.take() {
                    events.push(Event::Html(highlight_html(&code, &lang).into()));
                }
            }
            Event::Text(chunk) if code_block.is_some() => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&chunk);
                }
            }
            Event::Start(Tag::HtmlBlock) => events.push(Event::Start(Tag::Paragraph)),
            Event::End(TagEnd::HtmlBlock) => events.push(Event::End(TagEnd::Paragraph)),
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Remove escape sequences and control characters so text can't drive the terminal
///
/// Newlines and tabs are kept.
pub fn strip_terminal_controls(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t');
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let without_sequences = ESCAPE_SEQUENCE.replace_all(text, "");
    Cow::Owned(
        without_sequences
            .chars()
            .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
            .collect(),
    )
}
