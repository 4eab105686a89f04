//! Chat model trait and message types.
//!
//! The responder is single-shot retrieve-then-generate: one rendered
//! message sequence in, one text completion out. No tool calls, no
//! streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The role of a chat message on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End-user input.
    User,
}

/// A single rendered chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The message role.
    pub role: MessageRole,
    /// The message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }
}

/// A language model invoked with a rendered message sequence.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for the given messages.
    ///
    /// Returns the model's text output verbatim.
    async fn generate(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;

    /// The model identifier, for diagnostics.
    fn name(&self) -> &str;
}
