//! Message source abstraction.
//!
//! A message source (the chat client bridge) delivers [`InboundEvent`]s and
//! accepts [`OutboundReply`]s. The router only ever talks to the
//! [`MessageSource`] trait; the chat protocol, login and contact handling
//! stay on the other side of it.

pub mod classify;
pub mod error;
pub mod memory;
pub mod plugin;

pub use {
    error::{Error, Result},
    memory::{MemorySource, MemorySourceHandle},
    plugin::{ContentType, InboundEvent, MessageSource, OutboundReply, ReplyKind, ReplyTarget},
};
