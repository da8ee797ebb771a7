//! Inbound message processing: the glue between a message source and the
//! reply backend.
//!
//! Flow: inbound event → dedupe → classify → control command or query →
//! session update → reply delivered back through the source.

pub mod commands;
pub mod dedupe;
pub mod error;
pub mod router;
pub mod worker;

pub use {
    commands::Command,
    dedupe::Deduplicator,
    error::{Error, Result},
    router::Router,
    worker::run_workers,
};
