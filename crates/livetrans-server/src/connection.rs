//! One `WebSocket` client from upgrade through disconnect.
//!
//! The socket is split: a writer task drains a bounded outbound channel into
//! the sink, while the reader loop runs in the connection's own task and
//! handles fragments strictly in arrival order. A fragment's translation is
//! awaited before the next frame is read, so each session has at most one
//! translation in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use livetrans_core::{RegistryError, SessionId, TranslationRequest, TranslationResponse};
use livetrans_engine::{Action, SessionGuard};

use crate::config::ServerConfig;
use crate::context::RelayContext;
use crate::heartbeat::{run_heartbeat, HeartbeatResult};

/// Longest fragment prefix written to debug logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// Per-connection tunables taken from [`ServerConfig`].
#[derive(Clone, Copy, Debug)]
pub struct ConnectionSettings {
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub send_queue: usize,
    /// How long the writer may take to flush after the reader stops.
    pub drain_timeout: Duration,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
            send_queue: config.send_queue.max(1),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Outbound half of a connection plus its liveness flag.
pub struct Connection {
    id: SessionId,
    tx: mpsc::Sender<Message>,
    alive: AtomicBool,
}

impl Connection {
    pub fn new(id: SessionId, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            tx,
            alive: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Record inbound activity (any frame, including pongs).
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Read and clear the alive flag.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    /// Queue a ping. Returns `false` only once the writer is gone.
    pub fn ping(&self) -> bool {
        match self.tx.try_send(Message::Ping(Default::default())) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a frame, waiting for room. Returns `false` if the writer is gone.
    pub async fn send(&self, message: Message) -> bool {
        self.tx.send(message).await.is_ok()
    }

    async fn close(&self, code: u16, reason: &'static str) {
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        };
        let _ = self.send(Message::Close(Some(frame))).await;
    }
}

/// Why the reader loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Client sent a Close frame.
    ClientClosed,
    /// Stream ended without a Close frame.
    Disconnected,
    /// Transport or protocol error from the socket (includes oversized messages).
    Transport(String),
    /// Client sent a frame type the relay does not accept.
    Unsupported,
    /// Heartbeat declared the client dead.
    HeartbeatTimeout,
    /// Server is shutting down.
    Shutdown,
    /// The session vanished from the registry.
    SessionLost,
}

impl ExitReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::Disconnected => "disconnected",
            Self::Transport(_) => "transport_error",
            Self::Unsupported => "unsupported_frame",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
            Self::SessionLost => "session_lost",
        }
    }

    /// Close frame the server sends, if it initiates the close.
    fn close_frame(&self) -> Option<(u16, &'static str)> {
        match self {
            Self::ClientClosed | Self::Disconnected | Self::Transport(_) => None,
            Self::Unsupported => Some((close_code::UNSUPPORTED, "binary frames are not supported")),
            Self::HeartbeatTimeout => Some((close_code::POLICY, "ping timeout")),
            Self::Shutdown => Some((close_code::AWAY, "server shutting down")),
            Self::SessionLost => Some((close_code::ERROR, "session lost")),
        }
    }
}

/// Run a session for a freshly upgraded socket until it disconnects.
pub async fn run_connection(
    socket: WebSocket,
    ctx: RelayContext,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) {
    let (mut sink, mut stream) = socket.split();

    let mut guard = match SessionGuard::open(Arc::clone(&ctx.registry), Instant::now()) {
        Ok(guard) => guard,
        Err(e) => {
            let reason = match e {
                RegistryError::CapacityExceeded { .. } => "capacity",
                RegistryError::Exhausted => "ids_exhausted",
                RegistryError::NotFound(_) => "not_found",
            };
            warn!(error = %e, "rejecting connection");
            ctx.metrics
                .counter_inc("connections_rejected_total", &[("reason", reason)], 1);
            let frame = CloseFrame {
                code: close_code::AGAIN,
                reason: e.to_string().into(),
            };
            let _ = sink.send(Message::Close(Some(frame))).await;
            return;
        }
    };

    let id = guard.id();
    ctx.metrics.counter_inc("sessions_opened_total", &[], 1);
    ctx.refresh_active_gauge();

    let exit = serve_session(&mut stream, sink, id, &ctx, settings, shutdown).await;

    let closed = guard.close();
    ctx.metrics
        .counter_inc("sessions_closed_total", &[("reason", exit.label())], 1);
    ctx.refresh_active_gauge();

    match closed {
        Some(session) => info!(
            session_id = %id,
            reason = exit.label(),
            duration_ms = session.opened_at.elapsed().as_millis() as u64,
            fragments = session.fragments,
            translations = session.translations,
            failures = session.failures,
            active_sessions = ctx.registry.len(),
            "session closed"
        ),
        None => warn!(session_id = %id, reason = exit.label(), "session already removed"),
    }
}

#[instrument(skip_all, fields(session_id = %id))]
async fn serve_session<S>(
    stream: &mut S,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    id: SessionId,
    ctx: &RelayContext,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) -> ExitReason
where
    S: futures::Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    info!(active_sessions = ctx.registry.len(), "session opened");

    let (tx, mut rx) = mpsc::channel::<Message>(settings.send_queue);
    let connection = Arc::new(Connection::new(id, tx));

    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let is_close = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || is_close {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let heartbeat_cancel = shutdown.child_token();
    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        settings.ping_interval,
        settings.ping_timeout,
        heartbeat_cancel.clone(),
    ));

    let exit = loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break ExitReason::Shutdown,
            result = &mut heartbeat => match result {
                Ok(HeartbeatResult::TimedOut) => {
                    warn!(timeout_secs = settings.ping_timeout.as_secs(), "client stopped answering pings");
                    break ExitReason::HeartbeatTimeout;
                }
                Ok(HeartbeatResult::Cancelled) => break ExitReason::Shutdown,
                Ok(HeartbeatResult::Disconnected) | Err(_) => break ExitReason::Disconnected,
            },
            frame = stream.next() => frame,
        };

        let message = match frame {
            None => break ExitReason::Disconnected,
            Some(Err(e)) => {
                debug!(error = %e, "websocket read failed");
                break ExitReason::Transport(e.to_string());
            }
            Some(Ok(message)) => message,
        };
        connection.mark_alive();

        match message {
            Message::Text(text) => match process_fragment(ctx, id, text.as_str()).await {
                Ok(Some(response)) => match response.to_json() {
                    Ok(json) => {
                        if !connection.send(Message::Text(json.into())).await {
                            debug!("writer gone, dropping response");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize response"),
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "registry rejected fragment");
                    break ExitReason::SessionLost;
                }
            },
            Message::Binary(data) => {
                warn!(len = data.len(), "binary frame received");
                break ExitReason::Unsupported;
            }
            Message::Close(frame) => {
                debug!(code = frame.as_ref().map(|f| f.code), "client sent close frame");
                break ExitReason::ClientClosed;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    };

    if !heartbeat.is_finished() {
        heartbeat_cancel.cancel();
        let _ = (&mut heartbeat).await;
    }

    if let Some((code, reason)) = exit.close_frame() {
        connection.close(code, reason).await;
    }
    drop(connection);

    if tokio::time::timeout(settings.drain_timeout, &mut writer).await.is_err() {
        debug!("writer did not drain in time");
        writer.abort();
    }

    exit
}

/// Feed one inbound text frame through the session's debounce state and,
/// when it fires, the translator.
///
/// Returns the message to send back, or `None` while the fragment is held.
pub async fn process_fragment(
    ctx: &RelayContext,
    id: SessionId,
    raw: &str,
) -> Result<Option<TranslationResponse>, RegistryError> {
    let fragment = raw.trim();
    ctx.metrics.counter_inc("fragments_received_total", &[], 1);
    debug!(
        session_id = %id,
        chars = fragment.chars().count(),
        preview = %preview(fragment),
        "fragment received"
    );

    let action = ctx.registry.observe(id, fragment, Instant::now())?;
    ctx.metrics
        .counter_inc("debounce_decisions_total", &[("action", action.label())], 1);

    let Action::Translate(text) = action else {
        return Ok(None);
    };

    let request = TranslationRequest::new(id, text);
    let outcome = ctx.translator.translate(&request.text).await;
    let latency_ms = request.elapsed().as_secs_f64() * 1000.0;
    ctx.metrics
        .histogram_observe("translation_latency_ms", &[], latency_ms);

    match &outcome {
        Ok(translation) => {
            ctx.metrics
                .counter_inc("translations_total", &[("outcome", "success")], 1);
            ctx.registry.translation_succeeded(id, Instant::now())?;
            info!(
                session_id = %id,
                latency_ms = latency_ms as u64,
                preview = %preview(translation),
                "translation sent"
            );
        }
        Err(e) => {
            ctx.metrics
                .counter_inc("translations_total", &[("outcome", "error")], 1);
            ctx.registry.translation_failed(id)?;
            warn!(
                session_id = %id,
                translator = ctx.translator.name(),
                kind = e.error_kind(),
                error = %e,
                "translation failed"
            );
        }
    }

    Ok(Some(request.into_response(outcome)))
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
