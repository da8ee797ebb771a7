use std::time::Duration;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Content category of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Plain text, either a query or a control command.
    Text,
    /// A text request asking for an image to be generated.
    ImageCreate,
    Image,
    Voice,
    /// Anything the source could not categorise.
    Unknown,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::ImageCreate => "image_create",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Where a reply has to be delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    /// Chat/room ID the reply is sent to.
    pub receiver: String,
    /// Group member to @mention on text replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
}

impl ReplyTarget {
    pub fn direct(receiver: impl Into<String>) -> Self {
        Self {
            receiver: receiver.into(),
            mention: None,
        }
    }
}

/// An inbound chat event delivered by a message source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Source-assigned message identifier, used for deduplication.
    pub id: String,
    /// Scopes the session this event belongs to.
    pub conversation_key: String,
    pub is_group: bool,
    pub content: String,
    pub content_type: ContentType,
    pub reply_to: ReplyTarget,
}

impl InboundEvent {
    /// A direct-message text event replying to `conversation_key`.
    pub fn text(
        id: impl Into<String>,
        conversation_key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let conversation_key = conversation_key.into();
        Self {
            id: id.into(),
            reply_to: ReplyTarget::direct(conversation_key.clone()),
            conversation_key,
            is_group: false,
            content: content.into(),
            content_type: ContentType::Text,
        }
    }
}

/// Kind of an outbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Generated reply text.
    Text,
    /// Acknowledgement of a control command.
    Info,
    /// A failure the user should see.
    Error,
}

impl ReplyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A reply handed back to the message source for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub conversation_key: String,
    pub target: ReplyTarget,
    pub kind: ReplyKind,
    pub content: String,
}

impl OutboundReply {
    /// Build a reply addressed to the origin of `event`.
    pub fn to_event(event: &InboundEvent, kind: ReplyKind, content: impl Into<String>) -> Self {
        Self {
            conversation_key: event.conversation_key.clone(),
            target: event.reply_to.clone(),
            kind,
            content: content.into(),
        }
    }
}

/// Bridge to an external chat client.
///
/// Implementations must be safe to share between workers: `receive` may be
/// called concurrently and each event must be handed to exactly one caller.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Source identifier (e.g. "wechat", "memory"), used in logs.
    fn id(&self) -> &str;

    /// Wait up to `timeout` for the next inbound event.
    ///
    /// `Ok(None)` means the timeout elapsed without traffic.
    /// [`Error::Closed`](crate::Error::Closed) means no event will ever
    /// arrive again.
    async fn receive(&self, timeout: Duration) -> Result<Option<InboundEvent>>;

    /// Deliver a reply to its target conversation.
    async fn send(&self, reply: &OutboundReply) -> Result<()>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_inherits_event_target() {
        let mut event = InboundEvent::text("m1", "room1", "hello");
        event.is_group = true;
        event.reply_to.mention = Some("wxid_alice".into());

        let reply = OutboundReply::to_event(&event, ReplyKind::Text, "hi there");
        assert_eq!(reply.conversation_key, "room1");
        assert_eq!(reply.target.receiver, "room1");
        assert_eq!(reply.target.mention.as_deref(), Some("wxid_alice"));
    }

    #[test]
    fn content_type_serializes_snake_case() {
        let json = serde_json::to_value(ContentType::ImageCreate).unwrap();
        assert_eq!(json, "image_create");
        assert_eq!(ContentType::ImageCreate.to_string(), "image_create");
    }
}
