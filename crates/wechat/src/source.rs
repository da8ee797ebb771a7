//! [`MessageSource`] backed by the chat client sidecar.
//!
//! A background task keeps a WebSocket open to the sidecar, reconnecting
//! with exponential backoff. Inbound message frames are mapped to
//! [`InboundEvent`]s and queued for [`receive`](MessageSource::receive);
//! replies are encoded as `send_text` frames and queued for the writer.

use std::time::Duration;

use {
    async_trait::async_trait,
    chatrelay_channels::{
        Error as ChannelError, InboundEvent, MessageSource, OutboundReply,
        Result as ChannelResult,
    },
    chatrelay_config::SourceConfig,
    futures::{Sink, SinkExt, StreamExt},
    tokio::{
        sync::{Mutex, mpsc},
        task::JoinHandle,
    },
    tokio_tungstenite::{
        connect_async,
        tungstenite::{Error as WsError, Message},
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    error::{Context, Result},
    frames::SidecarFrame,
    mapping::{to_inbound, to_send_text},
};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

pub struct WechatSource {
    inbound: Mutex<mpsc::UnboundedReceiver<InboundEvent>>,
    /// JSON text frames for the WebSocket writer.
    write_tx: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl WechatSource {
    /// Start the connection task. Returns immediately; the connection is
    /// established (and re-established) in the background.
    pub fn spawn(config: SourceConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(connection_loop(config, event_tx, write_rx));
        Self {
            inbound: Mutex::new(event_rx),
            write_tx,
            task: Some(task),
        }
    }
}

impl Drop for WechatSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl MessageSource for WechatSource {
    fn id(&self) -> &str {
        "wechat"
    }

    async fn receive(&self, timeout: Duration) -> ChannelResult<Option<InboundEvent>> {
        let mut inbound = self.inbound.lock().await;
        match tokio::time::timeout(timeout, inbound.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(ChannelError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn send(&self, reply: &OutboundReply) -> ChannelResult<()> {
        let Some(frame) = to_send_text(reply) else {
            return Ok(());
        };
        let json = serde_json::to_string(&frame).map_err(ChannelError::unavailable)?;
        self.write_tx
            .send(json)
            .map_err(|_| ChannelError::unavailable("sidecar connection task has stopped"))
    }
}

/// Main connection loop with auto-reconnect.
async fn connection_loop(
    config: SourceConfig,
    event_tx: mpsc::UnboundedSender<InboundEvent>,
    mut write_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut backoff = INITIAL_BACKOFF;
    // Survives reconnects: the sidecar only announces the login once.
    let mut self_wxid: Option<String> = None;
    // A frame whose write failed; retried first on the next connection.
    let mut pending: Option<String> = None;

    loop {
        info!(url = %config.url, "connecting to sidecar");

        let state = ConnectionState {
            self_wxid: &mut self_wxid,
            pending: &mut pending,
            backoff: &mut backoff,
        };
        match connect_and_run(&config, &event_tx, &mut write_rx, state).await {
            Ok(Shutdown::Reconnect) => {
                debug!("sidecar connection closed");
            },
            Ok(Shutdown::Stop) => {
                debug!("source dropped, stopping sidecar connection");
                return;
            },
            Err(e) => {
                error!(error = %e, "sidecar connection error");
            },
        }

        info!(delay_ms = backoff.as_millis(), "reconnecting after delay");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

enum Shutdown {
    Reconnect,
    Stop,
}

/// Per-source state carried across connections.
struct ConnectionState<'a> {
    self_wxid: &'a mut Option<String>,
    pending: &'a mut Option<String>,
    backoff: &'a mut Duration,
}

/// Single connection attempt: connect, then forward frames both ways.
async fn connect_and_run(
    config: &SourceConfig,
    event_tx: &mpsc::UnboundedSender<InboundEvent>,
    write_rx: &mut mpsc::UnboundedReceiver<String>,
    state: ConnectionState<'_>,
) -> Result<Shutdown> {
    let ConnectionState {
        self_wxid,
        pending,
        backoff,
    } = state;

    let (ws_stream, _response) = connect_async(config.url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", config.url))?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();
    info!(url = %config.url, "connected to sidecar");
    *backoff = INITIAL_BACKOFF;

    flush_pending(&mut ws_sink, pending).await?;

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = handle_frame(&text, self_wxid, config)
                            && event_tx.send(event).is_err()
                        {
                            return Ok(Shutdown::Stop);
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return Ok(Shutdown::Reconnect);
                    },
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(e.into()),
                }
            },
            json = write_rx.recv() => {
                match json {
                    Some(text) => {
                        *pending = Some(text);
                        flush_pending(&mut ws_sink, pending).await?;
                    },
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        return Ok(Shutdown::Stop);
                    },
                }
            },
        }
    }
}

/// Write the held frame, if any. On failure the frame stays held so the
/// next connection can retry it.
async fn flush_pending<S>(sink: &mut S, pending: &mut Option<String>) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    if let Some(text) = pending.as_deref() {
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            warn!(error = %e, frame = %text, "sidecar write failed, keeping frame for retry");
            return Err(e.into());
        }
        *pending = None;
    }
    Ok(())
}

/// Decode one text frame. Returns the event to queue, if any.
fn handle_frame(
    text: &str,
    self_wxid: &mut Option<String>,
    config: &SourceConfig,
) -> Option<InboundEvent> {
    let frame: SidecarFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "ignoring malformed sidecar frame");
            return None;
        },
    };

    match frame {
        SidecarFrame::Login { wxid, name } => {
            info!(wxid = %wxid, name = %name, "sidecar logged in");
            *self_wxid = Some(wxid);
            None
        },
        SidecarFrame::Message(msg) => to_inbound(msg, self_wxid.as_deref(), config),
        SidecarFrame::Unknown => None,
    }
}
