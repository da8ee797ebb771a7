use {
    chatrelay_channels::{
        ContentType, InboundEvent, OutboundReply, ReplyKind, ReplyTarget, classify::classify_text,
    },
    chatrelay_config::SourceConfig,
    tracing::{debug, warn},
};

use crate::frames::{GatewayFrame, SidecarMessage, msg_type};

/// Convert a sidecar message into an inbound event.
///
/// Returns `None` for messages sent by the logged-in account itself.
pub fn to_inbound(
    msg: SidecarMessage,
    self_wxid: Option<&str>,
    config: &SourceConfig,
) -> Option<InboundEvent> {
    if msg.is_self || self_wxid.is_some_and(|me| me == msg.sender) {
        debug!(message_id = %msg.id, "ignoring own message");
        return None;
    }

    let (content_type, content) = match msg.msg_type {
        msg_type::TEXT => classify_text(&msg.content, &config.image_create_prefixes),
        msg_type::IMAGE => (ContentType::Image, msg.content),
        msg_type::VOICE => (ContentType::Voice, msg.content),
        _ => (ContentType::Unknown, msg.content),
    };

    let is_group = msg.is_group && !msg.roomid.is_empty();
    let (conversation_key, reply_to) = if is_group {
        let key = if config.group_session_per_user {
            format!("{}:{}", msg.roomid, msg.sender)
        } else {
            msg.roomid.clone()
        };
        (key, ReplyTarget {
            receiver: msg.roomid,
            mention: Some(msg.sender),
        })
    } else {
        (msg.sender.clone(), ReplyTarget::direct(msg.sender))
    };

    Some(InboundEvent {
        id: msg.id,
        conversation_key,
        is_group,
        content,
        content_type,
        reply_to,
    })
}

/// Build the `send_text` frame for a reply.
///
/// Only generated text mentions the group member; info and error replies go
/// out as plain text. Returns `None` when the reply has no receiver.
pub fn to_send_text(reply: &OutboundReply) -> Option<GatewayFrame> {
    if reply.target.receiver.is_empty() {
        warn!(
            conversation_key = %reply.conversation_key,
            kind = reply.kind.as_str(),
            "dropping reply without receiver"
        );
        return None;
    }

    let aters = match (reply.kind, &reply.target.mention) {
        (ReplyKind::Text, Some(member)) => member.clone(),
        _ => String::new(),
    };
    Some(GatewayFrame::SendText {
        receiver: reply.target.receiver.clone(),
        content: reply.content.clone(),
        aters,
    })
}
