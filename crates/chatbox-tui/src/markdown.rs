//! Transcript messages as styled terminal lines
//!
//! Assistant replies are walked with pulldown-cmark the same way the HTML
//! pipeline walks them: raw HTML is shown as literal text, soft breaks are
//! line breaks and fenced code goes through the syntax highlighter. All text
//! is stripped of terminal control sequences before it becomes a span.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

use chatbox_core::highlight::highlight_terminal;
use chatbox_core::render::strip_terminal_controls;
use chatbox_core::{ChatMessage, ChatRole};

#[derive(Clone, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

pub fn role_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ChatRole::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn clean(text: &str) -> String {
    strip_terminal_controls(text).replace('\t', "    ")
}

fn flush(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>, indent: &str) {
    if spans.is_empty() {
        return;
    }
    let mut line = Vec::with_capacity(spans.len() + 1);
    if !indent.is_empty() {
        line.push(Span::raw(indent.to_string()));
    }
    line.append(spans);
    lines.push(Line::from(line));
}

fn blank_after(lines: &mut Vec<Line<'static>>) {
    if lines.last().map(|l| l.width() > 0).unwrap_or(false) {
        lines.push(Line::default());
    }
}

/// Role header, body and a trailing blank line
pub fn render_message(message: &ChatMessage, theme: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("{}:", message.role.display_name()),
        role_style(message.role),
    ))];

    match message.role {
        ChatRole::User => {
            for line in clean(&message.content).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant => lines.extend(render_markdown(&message.content, theme)),
    }

    lines.push(Line::default());
    lines
}

/// Markdown to terminal lines
pub fn render_markdown(content: &str, theme: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let content = strip_terminal_controls(content);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![Style::default()];
    let mut list_stack: Vec<ListKind> = Vec::new();
    let mut quote_depth = 0usize;
    let mut code_block: Option<(String, String)> = None;
    let mut link_targets: Vec<String> = Vec::new();

    let indent = |list_depth: usize, quote_depth: usize| -> String {
        let mut s = "│ ".repeat(quote_depth);
        s.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
        s
    };

    for event in Parser::new_ext(&content, options) {
        let top = *style_stack.last().unwrap_or(&Style::default());
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    let mut style = top.add_modifier(Modifier::BOLD);
                    if level == HeadingLevel::H1 {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    style_stack.push(style);
                }
                Tag::BlockQuote { .. } => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    quote_depth += 1;
                    style_stack.push(top.fg(Color::Gray).add_modifier(Modifier::ITALIC));
                }
                Tag::List(start) => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    list_stack.push(match start {
                        Some(n) => ListKind::Ordered(n),
                        None => ListKind::Unordered,
                    });
                }
                Tag::Item => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    let marker = match list_stack.last_mut() {
                        Some(ListKind::Ordered(n)) => {
                            let marker = format!("{}. ", n);
                            *n += 1;
                            marker
                        }
                        _ => "• ".to_string(),
                    };
                    current.push(Span::styled(marker, Style::default().fg(Color::Yellow)));
                }
                Tag::CodeBlock(kind) => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code_block = Some((lang, String::new()));
                }
                Tag::Emphasis => style_stack.push(top.add_modifier(Modifier::ITALIC)),
                Tag::Strong => style_stack.push(top.add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => style_stack.push(top.add_modifier(Modifier::CROSSED_OUT)),
                Tag::Link { dest_url, .. } => {
                    link_targets.push(dest_url.to_string());
                    style_stack.push(top.fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
                }
                Tag::TableCell => {
                    if !current.is_empty() {
                        current.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
                    }
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Paragraph => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    if list_stack.is_empty() {
                        blank_after(&mut lines);
                    }
                }
                TagEnd::Heading(_) => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    blank_after(&mut lines);
                    style_stack.pop();
                }
                TagEnd::BlockQuote { .. } => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    quote_depth = quote_depth.saturating_sub(1);
                    style_stack.pop();
                    blank_after(&mut lines);
                }
                TagEnd::List(_) => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    list_stack.pop();
                    if list_stack.is_empty() {
                        blank_after(&mut lines);
                    }
                }
                TagEnd::Item => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                }
                TagEnd::CodeBlock => {
                    if let Some((lang, code)) = code_block.take() {
                        let prefix = indent(list_stack.len(), quote_depth);
                        for spans in highlight_terminal(&code, &lang, theme) {
                            let mut line = vec![Span::raw(format!("{}  ", prefix))];
                            line.extend(spans.into_iter().map(|span| {
                                let mut style = Style::default();
                                if let Some((r, g, b)) = span.rgb {
                                    style = style.fg(Color::Rgb(r, g, b));
                                }
                                if span.bold {
                                    style = style.add_modifier(Modifier::BOLD);
                                }
                                if span.italic {
                                    style = style.add_modifier(Modifier::ITALIC);
                                }
                                if span.underline {
                                    style = style.add_modifier(Modifier::UNDERLINED);
                                }
                                Span::styled(clean(&span.text), style)
                            }));
                            lines.push(Line::from(line));
                        }
                        blank_after(&mut lines);
                    }
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                    style_stack.pop();
                }
                TagEnd::Link => {
                    style_stack.pop();
                    if let Some(url) = link_targets.pop() {
                        if !url.is_empty() {
                            current.push(Span::styled(
                                format!(" ({})", clean(&url)),
                                Style::default().fg(Color::DarkGray),
                            ));
                        }
                    }
                }
                TagEnd::TableHead | TagEnd::TableRow => {
                    flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                }
                TagEnd::Table => blank_after(&mut lines),
                _ => {}
            },
            Event::Text(text) => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    current.push(Span::styled(clean(&text), top));
                }
            }
            Event::Code(code) => {
                current.push(Span::styled(
                    clean(&code),
                    Style::default().fg(Color::LightRed).bg(Color::Black),
                ));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                // Raw HTML is shown, never interpreted
                for (i, piece) in clean(&raw).split('\n').enumerate() {
                    if i > 0 {
                        flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                    }
                    if !piece.is_empty() {
                        current.push(Span::styled(piece.to_string(), top));
                    }
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
            }
            Event::Rule => {
                flush(&mut lines, &mut current, &indent(list_stack.len(), quote_depth));
                lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )));
                blank_after(&mut lines);
            }
            Event::TaskListMarker(checked) => {
                current.push(Span::raw(if checked { "[x] " } else { "[ ] " }));
            }
            _ => {}
        }
    }

    flush(&mut lines, &mut current, "");
    while lines.last().map(|l| l.width() == 0).unwrap_or(false) {
        lines.pop();
    }
    lines
}

/// Hard-wrap a line at `width` display columns, keeping span styles
///
/// Wide characters count as two columns and never straddle a row edge.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line.clone()];
    }

    let mut out = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for span in &line.spans {
        let mut chunk = String::new();
        for c in span.content.chars() {
            let w = c.width().unwrap_or(0);
            if used > 0 && used + w > width {
                if !chunk.is_empty() {
                    row.push(Span::styled(std::mem::take(&mut chunk), span.style));
                }
                out.push(Line::from(std::mem::take(&mut row)));
                used = 0;
            }
            chunk.push(c);
            used += w;
        }
        if !chunk.is_empty() {
            row.push(Span::styled(chunk, span.style));
        }
    }
    if !row.is_empty() {
        out.push(Line::from(row));
    }
    out
}
