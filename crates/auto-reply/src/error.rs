use {chatrelay_channels::ContentType, thiserror::Error};

/// Reasons an inbound event is answered with an error reply.
///
/// None of these stop the worker loop; the router turns each into a
/// user-visible message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("image generation is not supported")]
    UnsupportedContent { content_type: ContentType },

    #[error("unsupported message type: {content_type}")]
    UnknownContentCategory { content_type: ContentType },

    #[error(transparent)]
    Reply(#[from] chatrelay_reply_client::Error),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedContent { .. } => "unsupported_content",
            Self::UnknownContentCategory { .. } => "unknown_content_category",
            Self::Reply(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
