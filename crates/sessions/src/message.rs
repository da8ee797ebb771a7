//! Turn types exchanged with the reply backend.
//!
//! A turn serializes as `{"role": "user", "content": "..."}`, which is the
//! element shape of the backend's `messages` array.

use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_backend_message() {
        let json = serde_json::to_value(Turn::user("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));

        let json = serde_json::to_value(Turn::assistant("hi there")).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn rejects_unknown_role() {
        let parsed = serde_json::from_value::<Turn>(serde_json::json!({
            "role": "system",
            "content": "be brief"
        }));
        assert!(parsed.is_err());
    }
}
