#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    chatrelay_auto_reply::{Router, run_workers},
    chatrelay_channels::{
        Error as SourceError, InboundEvent, MemorySource, MemorySourceHandle, MessageSource,
        OutboundReply, ReplyKind, Result as SourceResult,
    },
    chatrelay_config::RelayConfig,
    chatrelay_reply_client::HttpReplyClient,
    chatrelay_sessions::{SessionStore, Turn},
    mockito::Matcher,
    serde_json::json,
    tokio_util::sync::CancellationToken,
};

const POLL: Duration = Duration::from_millis(20);

struct Relay {
    router: Arc<Router>,
    source: Arc<MemorySource>,
    handle: MemorySourceHandle,
    sessions: Arc<SessionStore>,
}

fn relay(config: &RelayConfig) -> Relay {
    let backend = Arc::new(HttpReplyClient::new(&config.backend).unwrap());
    let sessions = Arc::new(SessionStore::new());
    let router = Arc::new(Router::new(backend, Arc::clone(&sessions), config));
    let (source, handle) = MemorySource::new();
    Relay {
        router,
        source: Arc::new(source),
        handle,
        sessions,
    }
}

fn config_for(server: &mockito::Server) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.backend.url = Some(format!("{}/reply", server.url()));
    config.backend.timeout_secs = 5;
    config
}

/// Feed `events` through a single worker until the source drains.
async fn run_to_completion(relay: &mut Relay, events: Vec<InboundEvent>) -> Vec<OutboundReply> {
    for event in events {
        assert!(relay.handle.push(event));
    }
    relay.handle.close();
    run_workers(
        Arc::clone(&relay.router),
        relay.source.clone(),
        1,
        POLL,
        CancellationToken::new(),
    )
    .await;
    relay.handle.drain_replies()
}

#[tokio::test]
async fn hello_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/reply")
        .match_body(Matcher::Json(json!({
            "messages": [{"role": "user", "content": "hello"}],
            "userId": ""
        })))
        .with_status(200)
        .with_body(json!({"response": "hi there"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut relay = relay(&config_for(&server));
    let replies =
        run_to_completion(&mut relay, vec![InboundEvent::text("m1", "u1", "hello")]).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].kind, ReplyKind::Text);
    assert_eq!(replies[0].content, "hi there");
    assert_eq!(replies[0].target.receiver, "u1");
    assert_eq!(
        relay.sessions.export("u1"),
        vec![Turn::user("hello"), Turn::assistant("hi there")]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_backend_url_yields_error_reply() {
    let mut relay = relay(&RelayConfig::default());
    let replies =
        run_to_completion(&mut relay, vec![InboundEvent::text("m1", "u1", "hello")]).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].kind, ReplyKind::Error);
    assert!(replies[0].content.contains("not configured"));
    assert_eq!(relay.sessions.export("u1"), vec![Turn::user("hello")]);
}

#[tokio::test]
async fn repeated_message_id_is_answered_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/reply")
        .with_status(200)
        .with_body(r#"{"response": "only once"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut relay = relay(&config_for(&server));
    let replies = run_to_completion(&mut relay, vec![
        InboundEvent::text("m1", "u1", "hello"),
        InboundEvent::text("m1", "u1", "hello"),
    ])
    .await;

    assert_eq!(replies.len(), 1);
    assert_eq!(relay.sessions.len("u1"), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn configured_clear_command_skips_backend() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/reply")
        .with_status(200)
        .with_body(r#"{"response": "noted"}"#)
        .expect(2)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.commands.clear_session = "#forget".into();
    let mut relay = relay(&config);

    let replies = run_to_completion(&mut relay, vec![
        InboundEvent::text("m1", "u1", "first"),
        InboundEvent::text("m2", "u1", "second"),
        InboundEvent::text("m3", "u1", "#forget"),
    ])
    .await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[2].kind, ReplyKind::Info);
    assert!(relay.sessions.export("u1").is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn backend_failure_status_reaches_user() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/reply")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let mut relay = relay(&config_for(&server));
    let replies =
        run_to_completion(&mut relay, vec![InboundEvent::text("m1", "u1", "hello")]).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].kind, ReplyKind::Error);
    assert!(replies[0].content.contains("502"));
    assert_eq!(relay.sessions.export("u1"), vec![Turn::user("hello")]);
}

#[tokio::test]
async fn workers_stop_on_cancellation() {
    let relay = relay(&RelayConfig::default());
    let cancel = CancellationToken::new();
    let running = tokio::spawn(run_workers(
        Arc::clone(&relay.router),
        relay.source.clone(),
        3,
        POLL,
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("workers did not stop")
        .unwrap();
}

/// Source that replays a fixed script of receive results and rejects the
/// first reply it is asked to deliver.
struct FlakySource {
    script: Mutex<VecDeque<SourceResult<Option<InboundEvent>>>>,
    sends: Mutex<usize>,
    delivered: Mutex<Vec<OutboundReply>>,
}

impl FlakySource {
    fn new(script: Vec<SourceResult<Option<InboundEvent>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            sends: Mutex::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageSource for FlakySource {
    fn id(&self) -> &str {
        "flaky"
    }

    async fn receive(&self, _timeout: Duration) -> SourceResult<Option<InboundEvent>> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SourceError::Closed))
    }

    async fn send(&self, reply: &OutboundReply) -> SourceResult<()> {
        let mut sends = self.sends.lock().unwrap();
        *sends += 1;
        if *sends == 1 {
            return Err(SourceError::unavailable("sidecar not connected"));
        }
        self.delivered.lock().unwrap().push(reply.clone());
        Ok(())
    }
}

#[tokio::test]
async fn worker_survives_receive_and_send_failures() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/reply")
        .with_status(200)
        .with_body(r#"{"response": "ok"}"#)
        .expect(2)
        .create_async()
        .await;

    let relay = relay(&config_for(&server));
    let source = Arc::new(FlakySource::new(vec![
        Ok(Some(InboundEvent::text("m1", "u1", "a"))),
        Err(SourceError::unavailable("socket reset")),
        Ok(Some(InboundEvent::text("m2", "u1", "b"))),
        Ok(Some(InboundEvent::text("m2", "u1", "b"))),
    ]));

    tokio::time::timeout(
        Duration::from_secs(5),
        run_workers(
            Arc::clone(&relay.router),
            source.clone(),
            1,
            POLL,
            CancellationToken::new(),
        ),
    )
    .await
    .expect("worker did not drain the script");

    // The reply to m1 was lost in delivery; m2 was answered once.
    let delivered = source.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].kind, ReplyKind::Text);
    assert_eq!(*source.sends.lock().unwrap(), 2);
    assert_eq!(
        relay.sessions.export("u1"),
        vec![
            Turn::user("a"),
            Turn::assistant("ok"),
            Turn::user("b"),
            Turn::assistant("ok"),
        ]
    );
    mock.assert_async().await;
}
