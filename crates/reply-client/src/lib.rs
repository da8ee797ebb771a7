//! Client for the reply backend.
//!
//! The backend receives the whole conversation as
//! `{"messages": [{"role", "content"}...], "userId": "..."}` and answers
//! `{"response": "..."}`. Every other outcome is a typed [`Error`]; nothing
//! is retried here.

pub mod client;
pub mod error;

pub use {
    client::{HttpReplyClient, ReplyBackend},
    error::{Error, Result},
};
