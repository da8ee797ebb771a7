use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Instant,
};

use {
    chatrelay_channels::{ContentType, InboundEvent, OutboundReply, ReplyKind},
    chatrelay_config::{CommandsConfig, RelayConfig},
    chatrelay_reply_client::ReplyBackend,
    chatrelay_sessions::SessionStore,
    tokio::sync::{Mutex, RwLock},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{auto_reply as auto_reply_metrics, counter, histogram, labels};

use crate::{
    commands::Command,
    dedupe::Deduplicator,
    error::{Error, Result},
};

/// Idle per-key locks are pruned once the map grows past this size.
const KEY_LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Turns inbound events into replies.
///
/// Every event that survives deduplication produces exactly one
/// [`OutboundReply`]; duplicates produce none. The router is shared between
/// workers: requests for the same conversation key run one at a time, and
/// `clear_all` waits for in-flight requests to finish.
pub struct Router {
    backend: Arc<dyn ReplyBackend>,
    sessions: Arc<SessionStore>,
    dedupe: StdMutex<Deduplicator>,
    commands: CommandsConfig,
    user_id: String,
    /// Held shared by per-key work, exclusively by `clear_all`.
    epoch: RwLock<()>,
    key_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Router {
    pub fn new(
        backend: Arc<dyn ReplyBackend>,
        sessions: Arc<SessionStore>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            backend,
            sessions,
            dedupe: StdMutex::new(Deduplicator::from_config(&config.dedupe)),
            commands: config.commands.clone(),
            user_id: config.backend.user_id.clone().unwrap_or_default(),
            epoch: RwLock::new(()),
            key_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Process one inbound event. `None` means the event was a duplicate and
    /// is dropped without a reply.
    pub async fn handle(&self, event: &InboundEvent) -> Option<OutboundReply> {
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        #[cfg(feature = "metrics")]
        counter!(auto_reply_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        if self.is_duplicate(&event.id) {
            debug!(
                message_id = %event.id,
                conversation_key = %event.conversation_key,
                "dropping duplicate message"
            );
            #[cfg(feature = "metrics")]
            counter!(auto_reply_metrics::MESSAGES_DEDUPLICATED_TOTAL).increment(1);
            return None;
        }

        info!(
            message_id = %event.id,
            conversation_key = %event.conversation_key,
            is_group = event.is_group,
            content_type = %event.content_type,
            "incoming message: {}",
            event.content,
        );

        let reply = match self.route(event).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    message_id = %event.id,
                    conversation_key = %event.conversation_key,
                    kind = e.kind(),
                    error = %e,
                    "answering with error reply"
                );
                OutboundReply::to_event(event, ReplyKind::Error, e.to_string())
            },
        };

        #[cfg(feature = "metrics")]
        {
            counter!(
                auto_reply_metrics::REPLIES_TOTAL,
                labels::KIND => reply.kind.as_str()
            )
            .increment(1);
            histogram!(auto_reply_metrics::PROCESSING_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());
        }

        Some(reply)
    }

    fn is_duplicate(&self, id: &str) -> bool {
        let mut dedupe = self.dedupe.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        dedupe.sweep(now);
        dedupe.seen_or_record_at(id, now)
    }

    async fn route(&self, event: &InboundEvent) -> Result<OutboundReply> {
        match event.content_type {
            ContentType::Text => {},
            ContentType::ImageCreate => {
                return Err(Error::UnsupportedContent {
                    content_type: event.content_type,
                });
            },
            other => {
                return Err(Error::UnknownContentCategory {
                    content_type: other,
                });
            },
        }

        if let Some(command) = Command::parse(&event.content, &self.commands) {
            self.run_command(command, &event.conversation_key).await;
            let ack = command.acknowledgement(&self.commands);
            return Ok(OutboundReply::to_event(event, ReplyKind::Info, ack));
        }

        let text = self.query(&event.conversation_key, &event.content).await?;
        Ok(OutboundReply::to_event(event, ReplyKind::Text, text))
    }

    async fn run_command(&self, command: Command, key: &str) {
        match command {
            Command::ClearSession => {
                let _epoch = self.epoch.read().await;
                let _key = self.key_lock(key).lock_owned().await;
                self.sessions.clear(key);
            },
            Command::ClearAll => {
                let _epoch = self.epoch.write().await;
                self.sessions.clear_all();
            },
        }
        info!(
            conversation_key = key,
            command = command.as_str(),
            "session command executed"
        );
    }

    /// Append the user turn, ask the backend with the full history and
    /// record the answer. A failed call leaves the user turn in place.
    async fn query(&self, key: &str, content: &str) -> Result<String> {
        let _epoch = self.epoch.read().await;
        let _key = self.key_lock(key).lock_owned().await;

        self.sessions.append_user(key, content);
        let turns = self.sessions.export(key);
        let text = self.backend.generate(&turns, &self.user_id).await?;
        self.sessions.append_assistant(key, text.as_str());

        debug!(conversation_key = key, turns = turns.len() + 1, "reply recorded");
        Ok(text)
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() > KEY_LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}
