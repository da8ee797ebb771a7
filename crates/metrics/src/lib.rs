//! Metrics for chatrelay.
//!
//! Crates record through the `metrics` facade behind their own `metrics`
//! feature. Nothing is exported until the binary calls [`init_metrics`],
//! which installs a Prometheus recorder when built with `prometheus`.
//!
//! ```rust,ignore
//! use chatrelay_metrics::{auto_reply, counter};
//!
//! counter!(auto_reply::MESSAGES_RECEIVED_TOTAL).increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
