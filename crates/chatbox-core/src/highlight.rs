//! Syntax highlighting for fenced code blocks, backed by syntect
//!
//! Language hints are resolved by syntax name or file extension. When the
//! hint is missing or unknown the first line of the code is used to detect
//! a language (shebangs, `<?php`, doctypes), and plain text is the last
//! resort.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::render::escape_html;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// A run of highlighted text for terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub text: String,
    pub rgb: Option<(u8, u8, u8)>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl HighlightSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            rgb: None,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

/// First token of a fence info string: "rust,ignore" and "py title=x" both hint at the first word
fn hint_token(lang: &str) -> &str {
    lang.trim()
        .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .unwrap_or("")
}

/// Resolve the syntax for a code block from its hint, falling back to auto-detection
pub fn resolve_syntax(lang: &str, code: &str) -> &'static SyntaxReference {
    let token = hint_token(lang);
    if !token.is_empty() {
        if let Some(syntax) = SYNTAX_SET.find_syntax_by_token(token) {
            return syntax;
        }
    }

    SYNTAX_SET
        .find_syntax_by_first_line(code)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// CSS-friendly language name for the `language-*` class
fn language_class(lang: &str, syntax: &SyntaxReference) -> String {
    let token = hint_token(lang);
    if !token.is_empty() && SYNTAX_SET.find_syntax_by_token(token).is_some() {
        return token.to_lowercase();
    }
    if syntax.name == "Plain Text" {
        return "plaintext".to_string();
    }
    syntax.name.to_lowercase().replace(' ', "-")
}

/// Highlight a code block as class-styled HTML wrapped in `<pre><code>`
///
/// The generator escapes the code text, so the result is safe to embed.
pub fn highlight_html(code: &str, lang: &str) -> String {
    let syntax = resolve_syntax(lang, code);
    let class = escape_html(&language_class(lang, syntax));

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::warn!(error = %err, language = %class, "highlighting failed, emitting plain code");
            return format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                class,
                escape_html(code)
            );
        }
    }

    format!(
        "<pre><code class=\"language-{}\">{}</code></pre>\n",
        class,
        generator.finalize()
    )
}

/// Look up a bundled theme, falling back to the default theme
pub fn theme(name: &str) -> Option<&'static Theme> {
    THEMES
        .themes
        .get(name)
        .or_else(|| THEMES.themes.get(DEFAULT_THEME))
}

/// Highlight a code block into per-line styled spans for terminal output
///
/// Trailing newlines are stripped from every span. Lines that fail to
/// highlight are returned unstyled.
pub fn highlight_terminal(code: &str, lang: &str, theme_name: &str) -> Vec<Vec<HighlightSpan>> {
    let Some(theme) = theme(theme_name) else {
        return code.lines().map(|l| vec![HighlightSpan::plain(l)]).collect();
    };

    let syntax = resolve_syntax(lang, code);
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = Vec::new();

    for line in LinesWithEndings::from(code) {
        let stripped = line.trim_end_matches(['\n', '\r']);
        match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => {
                let spans = ranges
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches(['\n', '\r']);
                        if text.is_empty() {
                            return None;
                        }
                        let fg = style.foreground;
                        Some(HighlightSpan {
                            text: text.to_string(),
                            rgb: Some((fg.r, fg.g, fg.b)),
                            bold: style.font_style.contains(FontStyle::BOLD),
                            italic: style.font_style.contains(FontStyle::ITALIC),
                            underline: style.font_style.contains(FontStyle::UNDERLINE),
                        })
                    })
                    .collect();
                out.push(spans);
            }
            Err(_) => out.push(vec![HighlightSpan::plain(stripped)]),
        }
    }

    out
}
