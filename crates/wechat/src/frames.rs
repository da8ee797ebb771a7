//! JSON frames exchanged with the sidecar over the WebSocket.

use serde::{Deserialize, Deserializer, Serialize};

/// Message type codes reported by the chat client.
pub mod msg_type {
    pub const TEXT: u32 = 1;
    pub const IMAGE: u32 = 3;
    pub const VOICE: u32 = 34;
}

/// Frames sent by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarFrame {
    /// The chat client is logged in as `wxid`.
    Login {
        wxid: String,
        #[serde(default)]
        name: String,
    },
    Message(SidecarMessage),
    /// Frame types this bridge does not care about (heartbeats, contact
    /// updates, ...).
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SidecarMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub sender: String,
    #[serde(default)]
    pub roomid: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_self: bool,
    pub msg_type: u32,
    #[serde(default)]
    pub content: String,
}

/// Frames sent to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayFrame {
    SendText {
        receiver: String,
        content: String,
        /// Comma separated member ids to @mention; empty for none.
        aters: String,
    },
}

// The client reports message ids as 64-bit integers; some sidecar builds
// stringify them.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
