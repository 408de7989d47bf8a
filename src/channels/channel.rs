//! Transport-neutral chat events and the `ChatTransport` trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// A plain or command text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    /// Stable user identity (profile key).
    pub sender: String,
    /// Destination for replies.
    pub chat_id: String,
    pub text: String,
}

/// A button press carrying an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAction {
    pub sender: String,
    pub chat_id: String,
    pub payload: String,
    /// Token used to acknowledge the action to the transport.
    pub ack_token: String,
}

/// One inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Text(TextMessage),
    InlineAction(InlineAction),
}

impl ChatEvent {
    pub fn text(
        sender: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::Text(TextMessage {
            sender: sender.into(),
            chat_id: chat_id.into(),
            text: text.into(),
        })
    }

    pub fn inline_action(
        sender: impl Into<String>,
        chat_id: impl Into<String>,
        payload: impl Into<String>,
        ack_token: impl Into<String>,
    ) -> Self {
        Self::InlineAction(InlineAction {
            sender: sender.into(),
            chat_id: chat_id.into(),
            payload: payload.into(),
            ack_token: ack_token.into(),
        })
    }

    pub fn sender(&self) -> &str {
        match self {
            Self::Text(m) => &m.sender,
            Self::InlineAction(a) => &a.sender,
        }
    }

    pub fn chat_id(&self) -> &str {
        match self {
            Self::Text(m) => &m.chat_id,
            Self::InlineAction(a) => &a.chat_id,
        }
    }
}

/// A button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub payload: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: payload.into(),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// One button per row.
    pub fn single_column(buttons: impl IntoIterator<Item = InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Every payload on the keyboard, row by row.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.payload.as_str())
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
    /// Render `text` as Markdown.
    pub markdown: bool,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            markdown: false,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            markdown: true,
            ..Self::plain(text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Stream of inbound events.
pub type EventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// A chat transport the router consumes events from and replies through.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a message to a chat.
    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<(), ChannelError>;

    /// Acknowledge an inline action, optionally with a short notice.
    async fn acknowledge(&self, ack_token: &str, text: Option<&str>) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_accessors() {
        let text = ChatEvent::text("alice", "42", "/profile");
        assert_eq!(text.sender(), "alice");
        assert_eq!(text.chat_id(), "42");

        let action = ChatEvent::inline_action("bob", "43", "pay", "cb-1");
        assert_eq!(action.sender(), "bob");
        assert_eq!(action.chat_id(), "43");
    }

    #[test]
    fn single_column_keyboard() {
        let kb = InlineKeyboard::single_column([
            InlineButton::new("A", "a"),
            InlineButton::new("B", "b"),
        ]);
        assert_eq!(kb.rows.len(), 2);
        assert_eq!(kb.payloads().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn outgoing_builders() {
        let msg = OutgoingMessage::markdown("*hi*").with_keyboard(InlineKeyboard::default());
        assert!(msg.markdown);
        assert!(msg.keyboard.is_some());
        assert!(!OutgoingMessage::plain("hi").markdown);
    }
}
