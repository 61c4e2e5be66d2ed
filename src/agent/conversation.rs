//! Conversation state - an append-only message log

use serde::Serialize;

use super::message::Message;

/// Ordered message history owned by a single loop instance.
///
/// Only grows: appending consumes the previous state and hands back the
/// extended one. Past entries are never mutated or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Seed a conversation with the user's first message
    pub fn new(initial: Message) -> Self {
        Self {
            messages: vec![initial],
        }
    }

    /// Append one message
    #[must_use]
    pub fn push(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append messages, preserving their order
    #[must_use]
    pub fn append(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the trailing assistant message, if it is a terminal answer
    pub fn final_answer(&self) -> Option<&str> {
        match self.last() {
            Some(Message::Assistant { content, tool_calls }) if tool_calls.is_empty() => {
                Some(content)
            }
            _ => None,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let conv = Conversation::new(Message::human("hi"))
            .append(vec![Message::assistant("a"), Message::assistant("b")]);

        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["hi", "a", "b"]);
    }

    #[test]
    fn test_earlier_snapshot_unchanged() {
        let first = Conversation::new(Message::human("hi"));
        let snapshot = first.clone();
        let second = first.push(Message::assistant("hello"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second.messages()[0], snapshot.messages()[0]);
    }

    #[test]
    fn test_final_answer() {
        let conv = Conversation::new(Message::human("hi"));
        assert_eq!(conv.final_answer(), None);

        let conv = conv.push(Message::assistant("It is noon."));
        assert_eq!(conv.final_answer(), Some("It is noon."));
    }
}
