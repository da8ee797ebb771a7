/// Crate-wide result type for message source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed message source errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation is currently unavailable (not connected/ready).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },

    /// The source has shut down and will never yield another event.
    #[error("message source closed")]
    Closed,
}

impl Error {
    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}
