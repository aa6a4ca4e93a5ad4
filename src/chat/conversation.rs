//! In-memory conversation model.
//!
//! The controller mutates a [`Conversation`]; renderers read it through a
//! [`Cursor`] so they only draw what changed since their last look.

use crate::types::{HistoryEntry, Sender};

/// One rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Message text.
    pub text: String,
    /// Who the message is attributed to.
    pub sender: Sender,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    /// A reply from the companion.
    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Ai)
    }

    /// An error shown in place of a reply.
    pub fn ai_error(text: impl Into<String>) -> Self {
        Self::new(text, Sender::AiError)
    }
}

impl From<HistoryEntry> for ChatMessage {
    fn from(entry: HistoryEntry) -> Self {
        Self::new(entry.message, entry.sender)
    }
}

/// Position of a reader within a [`Conversation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    revision: u64,
    seen: usize,
}

/// What a reader has not yet seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    /// True if previously seen messages were cleared or replaced; the reader
    /// should discard what it drew before drawing `messages`.
    pub reset: bool,
    /// Messages to draw, in order.
    pub messages: Vec<ChatMessage>,
}

/// Ordered messages of the current run plus the typing indicator.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    typing: bool,
    revision: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replaces every message, e.g. with freshly loaded history.
    pub fn replace<I>(&mut self, messages: I)
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        self.messages = messages.into_iter().collect();
        self.revision += 1;
    }

    /// Removes every message and hides the typing indicator.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.typing = false;
        self.revision += 1;
    }

    /// Shows or hides the typing indicator.
    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    /// Returns true while a reply is awaited.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Returns the messages in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns what `cursor` has not seen and advances it.
    pub fn update_since(&self, cursor: &mut Cursor) -> Update {
        let reset = cursor.revision != self.revision;
        let start = if reset { 0 } else { cursor.seen.min(self.messages.len()) };
        cursor.revision = self.revision;
        cursor.seen = self.messages.len();
        Update {
            reset,
            messages: self.messages[start..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_sees_only_new_messages() {
        let mut conversation = Conversation::new();
        let mut cursor = Cursor::default();
        conversation.push(ChatMessage::user("hello"));

        let update = conversation.update_since(&mut cursor);
        assert!(!update.reset);
        assert_eq!(update.messages, vec![ChatMessage::user("hello")]);

        conversation.push(ChatMessage::ai("hi"));
        let update = conversation.update_since(&mut cursor);
        assert_eq!(update.messages, vec![ChatMessage::ai("hi")]);

        let update = conversation.update_since(&mut cursor);
        assert!(update.messages.is_empty());
    }

    #[test]
    fn replace_resets_readers() {
        let mut conversation = Conversation::new();
        let mut cursor = Cursor::default();
        conversation.push(ChatMessage::user("old"));
        conversation.update_since(&mut cursor);

        conversation.replace(vec![ChatMessage::user("a"), ChatMessage::ai("b")]);
        let update = conversation.update_since(&mut cursor);
        assert!(update.reset);
        assert_eq!(update.messages.len(), 2);
    }

    #[test]
    fn clear_hides_typing() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::user("hello"));
        conversation.set_typing(true);
        conversation.clear();
        assert!(conversation.is_empty());
        assert!(!conversation.is_typing());
    }

    #[test]
    fn history_entries_convert() {
        let message = ChatMessage::from(HistoryEntry {
            message: "hi".to_string(),
            sender: Sender::Ai,
        });
        assert_eq!(message, ChatMessage::ai("hi"));
    }
}
