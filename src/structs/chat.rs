use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::client::Client;
use super::typewriter::Typewriter;
use crate::errors::FishlogError;

/// Shown when the server answers without a reply.
pub const NO_RESPONSE_REPLY: &str = "⚠️ No response from LLM.";
/// Shown when the chat request fails.
pub const ERROR_REPLY: &str = "❌ Error contacting server.";

const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(20);

pub trait ChatSource {
    fn chat(&self, message: &str) -> impl Future<Output = Result<String, FishlogError>> + Send;
}

impl ChatSource for Client {
    async fn chat(&self, message: &str) -> Result<String, FishlogError> {
        Client::chat(self, message).await
    }
}

/// Text to show for a chat result: the reply, or a fallback when it is empty or the request failed.
pub fn reply_or_fallback(result: Result<String, FishlogError>) -> String {
    match result {
        Ok(reply) if reply.is_empty() => NO_RESPONSE_REPLY.to_string(),
        Ok(reply) => reply,
        Err(err) => {
            warn!(%err, "Chat request failed");
            ERROR_REPLY.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub content: String,
}

/// A conversation with the fishing assistant.
///
/// Every reply is revealed through the session's [`Typewriter`]; the history
/// always holds the full text.
#[derive(Debug)]
pub struct ChatSession<C> {
    source: C,
    messages: Vec<ChatMessage>,
    typewriter: Typewriter,
    typing_delay: Duration,
}

impl<C: ChatSource> ChatSession<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            messages: Vec::new(),
            typewriter: Typewriter::new(),
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The typewriter revealing the latest reply.
    pub fn typewriter(&self) -> &Typewriter {
        &self.typewriter
    }

    /// Sends `message` and starts revealing the reply.
    ///
    /// Blank input is ignored and returns `None`. Otherwise returns the full
    /// text being revealed, which is a fallback when no reply came back.
    /// Must be called from within a Tokio runtime.
    pub async fn send(&mut self, message: &str) -> Option<String> {
        if message.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage {
            sender: ChatSender::User,
            content: message.to_string(),
        });

        debug!(characters = message.len(), "Sending chat message");
        let reply = reply_or_fallback(self.source.chat(message).await);

        self.messages.push(ChatMessage {
            sender: ChatSender::Assistant,
            content: reply.clone(),
        });
        self.typewriter.reveal(reply.clone(), self.typing_delay);

        Some(reply)
    }
}
