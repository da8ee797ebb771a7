//! Error helpers shared by chatrelay crates.

pub mod error;

pub use error::FromMessage;
