use thiserror::Error;

/// Why a reply could not be produced. The `Display` text is shown to the
/// chat user verbatim.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reply backend is not configured (set backend.url)")]
    ConfigurationMissing,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("reply backend request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("reply backend request failed with status {code}")]
    Status { code: u16 },

    #[error("reply backend returned invalid JSON: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("reply backend response has an unexpected shape: {message}")]
    UnexpectedShape { message: String },
}

impl Error {
    #[must_use]
    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            message: message.into(),
        }
    }

    /// Stable short name, used as a log field and metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "configuration_missing",
            Self::Client(_) => "client",
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::UnexpectedShape { .. } => "unexpected_shape",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
