//! Append-only conversation log with transient loading indicators

use crate::render::{escape_html, render};
use crate::state::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingKind {
    /// First exchange after start-up
    Connecting,
    Generating,
}

impl LoadingKind {
    pub fn label(&self) -> &'static str {
        match self {
            LoadingKind::Connecting => "Connecting...",
            LoadingKind::Generating => "Generating response...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingIndicator {
    pub id: IndicatorId,
    pub kind: LoadingKind,
}

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    indicators: Vec<LoadingIndicator>,
    next_indicator: u64,
    scroll: u16,
    follow_tail: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            follow_tail: true,
            ..Self::default()
        }
    }

    /// Render `raw` for its role, append it and scroll to the bottom
    pub fn append(&mut self, role: ChatRole, raw: &str) -> &ChatMessage {
        let html = render(role, raw);
        self.messages.push(ChatMessage {
            role,
            content: raw.to_string(),
            html,
        });
        self.follow_tail = true;
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn count_role(&self, role: ChatRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn show_indicator(&mut self, kind: LoadingKind) -> IndicatorId {
        let id = IndicatorId(self.next_indicator);
        self.next_indicator += 1;
        self.indicators.push(LoadingIndicator { id, kind });
        self.follow_tail = true;
        id
    }

    /// Returns whether the indicator was present
    pub fn remove_indicator(&mut self, id: IndicatorId) -> bool {
        let before = self.indicators.len();
        self.indicators.retain(|indicator| indicator.id != id);
        self.indicators.len() != before
    }

    pub fn clear_indicators(&mut self) {
        self.indicators.clear();
    }

    pub fn indicators(&self) -> &[LoadingIndicator] {
        &self.indicators
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn follows_tail(&self) -> bool {
        self.follow_tail
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }

    /// Clamp the offset to `max_scroll`, snapping to it while following the tail
    ///
    /// Reaching the bottom by scrolling re-enables following.
    pub fn settle_scroll(&mut self, max_scroll: u16) -> u16 {
        if self.follow_tail || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow_tail = true;
        }
        self.scroll
    }

    /// The whole transcript as a standalone HTML page
    pub fn to_html_document(&self, title: &str) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        out.push_str("</head>\n<body>\n<div id=\"chat-messages\">\n");
        for message in &self.messages {
            out.push_str(&format!(
                "<div class=\"message {}-message\">\n{}</div>\n",
                message.role.as_str(),
                message.html
            ));
        }
        out.push_str("</div>\n</body>\n</html>\n");
        out
    }
}
