//! Metric name and label definitions.
//!
//! Centralizing these keeps names consistent between the crates that record
//! them and whatever dashboard scrapes them.

/// Inbound routing metrics
pub mod auto_reply {
    /// Total inbound events handed to the router
    pub const MESSAGES_RECEIVED_TOTAL: &str = "chatrelay_auto_reply_messages_received_total";
    /// Events dropped because their identifier was seen within the dedupe window
    pub const MESSAGES_DEDUPLICATED_TOTAL: &str =
        "chatrelay_auto_reply_messages_deduplicated_total";
    /// Replies emitted, labelled by reply kind
    pub const REPLIES_TOTAL: &str = "chatrelay_auto_reply_replies_total";
    /// Replies the message source failed to deliver
    pub const DELIVERY_FAILURES_TOTAL: &str = "chatrelay_auto_reply_delivery_failures_total";
    /// End-to-end processing duration per event in seconds
    pub const PROCESSING_DURATION_SECONDS: &str =
        "chatrelay_auto_reply_processing_duration_seconds";
}

/// Reply backend metrics
pub mod reply_client {
    /// Total requests sent to the reply backend
    pub const REQUESTS_TOTAL: &str = "chatrelay_reply_client_requests_total";
    /// Failed requests, labelled by failure kind
    pub const ERRORS_TOTAL: &str = "chatrelay_reply_client_errors_total";
    /// Backend request duration in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "chatrelay_reply_client_request_duration_seconds";
}

/// Session store metrics
pub mod sessions {
    /// Number of sessions currently registered
    pub const ACTIVE: &str = "chatrelay_sessions_active";
    /// Total turns appended across all sessions
    pub const TURNS_APPENDED_TOTAL: &str = "chatrelay_session_turns_appended_total";
}

/// Common label keys
pub mod labels {
    pub const KIND: &str = "kind";
    pub const ROLE: &str = "role";
}
