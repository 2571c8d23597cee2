//! UI-agnostic conversation state types
//!
//! These types are shared by the send controller, the transcript and any
//! front end drawing them, and don't depend on a specific UI framework.

use serde::{Deserialize, Serialize};

/// A message in the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Raw text as typed by the user or returned by the server
    pub content: String,
    /// Sanitized HTML produced when the message was appended
    pub html: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "AI",
        }
    }
}

/// Single-flight guard for the send lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Idle,
    Sending,
}

impl Lifecycle {
    pub fn is_busy(&self) -> bool {
        *self == Lifecycle::Sending
    }
}
