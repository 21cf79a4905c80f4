//! UI-agnostic conversation state
//!
//! This module contains the conversation container shared by any front end
//! (the terminal UI today). It holds no terminal or network types, so every
//! transition can be exercised directly from tests.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Greeting seeded as the first assistant turn of every session
pub const GREETING: &str = "您好！我是津药差旅智能助手。系统已加载最新的政策数据库，您可以直接提问。例如：“我是达仁堂的中层，去上海出差标准是多少？”";

/// Assistant turn appended when a query fails for any reason
pub const FAILURE_MESSAGE: &str = "查询失败，请检查配置。";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Awaiting,
}

/// Conversation state: the ordered turns, the pending input and whether a
/// query is in flight. At most one query is outstanding at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    pub input: String,
    phase: Phase,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            input: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    /// Whether the send control is enabled
    pub fn can_send(&self) -> bool {
        !self.is_awaiting() && !self.input.trim().is_empty()
    }

    /// Take the pending input as a user turn and enter the awaiting phase.
    ///
    /// Returns the trimmed message to send, or `None` when the input is blank
    /// or a query is already in flight. Nothing changes in the `None` case.
    pub fn submit(&mut self) -> Option<String> {
        if !self.can_send() {
            return None;
        }

        let message = self.input.trim().to_string();
        self.input.clear();
        self.messages.push(ChatMessage::user(message.clone()));
        self.phase = Phase::Awaiting;
        Some(message)
    }

    /// Finish the in-flight query with exactly one assistant turn.
    ///
    /// Errors are logged and replaced by [`FAILURE_MESSAGE`]. The session is
    /// back to idle on every path. Calling this while idle does nothing.
    pub fn resolve(&mut self, outcome: Result<String>) {
        if !self.is_awaiting() {
            return;
        }

        let content = match outcome {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "policy query failed");
                FAILURE_MESSAGE.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(content));
        self.phase = Phase::Idle;
    }
}
