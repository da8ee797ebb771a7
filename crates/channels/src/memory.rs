//! In-process message source backed by tokio channels.
//!
//! Used by the CLI's one-shot `ask` command and by router tests: events are
//! pushed through a [`MemorySourceHandle`] and delivered replies come back
//! out of it.

use std::time::Duration;

use {
    async_trait::async_trait,
    tokio::sync::{Mutex, mpsc},
    tracing::debug,
};

use crate::{Error, InboundEvent, MessageSource, OutboundReply, Result};

pub struct MemorySource {
    inbound: Mutex<mpsc::UnboundedReceiver<InboundEvent>>,
    outbound: mpsc::UnboundedSender<OutboundReply>,
}

/// Test/driver side of a [`MemorySource`].
pub struct MemorySourceHandle {
    inbound: Option<mpsc::UnboundedSender<InboundEvent>>,
    replies: mpsc::UnboundedReceiver<OutboundReply>,
}

impl MemorySource {
    pub fn new() -> (Self, MemorySourceHandle) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (
            Self {
                inbound: Mutex::new(in_rx),
                outbound: out_tx,
            },
            MemorySourceHandle {
                inbound: Some(in_tx),
                replies: out_rx,
            },
        )
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    fn id(&self) -> &str {
        "memory"
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<InboundEvent>> {
        let mut inbound = self.inbound.lock().await;
        match tokio::time::timeout(timeout, inbound.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(Error::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn send(&self, reply: &OutboundReply) -> Result<()> {
        debug!(
            conversation_key = %reply.conversation_key,
            kind = reply.kind.as_str(),
            "memory source delivering reply"
        );
        self.outbound
            .send(reply.clone())
            .map_err(|_| Error::unavailable("reply receiver dropped"))
    }
}

impl MemorySourceHandle {
    /// Queue an inbound event. Returns false once the source is gone.
    pub fn push(&self, event: InboundEvent) -> bool {
        self.inbound
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Stop producing events; the source reports `Closed` once drained.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Replies delivered so far, without waiting.
    pub fn drain_replies(&mut self) -> Vec<OutboundReply> {
        let mut out = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            out.push(reply);
        }
        out
    }
}
