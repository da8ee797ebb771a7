//! Per-conversation turn history.
//!
//! Sessions live in memory for the lifetime of the process. Each
//! conversation key owns exactly one ordered list of [`Turn`]s; callers only
//! ever see cloned snapshots.

pub mod message;
pub mod store;

pub use {
    message::{Role, Turn},
    store::SessionStore,
};
