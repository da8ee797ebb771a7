//! WeChat message source.
//!
//! The chat client runs inside an external sidecar process that exposes a
//! WebSocket speaking small JSON frames (see [`frames`]). This crate maps
//! those frames to inbound events and delivers replies back as `send_text`
//! frames.

pub mod error;
pub mod frames;
pub mod mapping;
pub mod source;

pub use {
    error::{Error, Result},
    source::WechatSource,
};
