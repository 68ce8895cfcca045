//! WebSocket handler for the clone observer.
//!
//! `/ws/clone` carries one observer session. The first client message must
//! be a clone request (`{"url": ...}`); afterwards the client may send a new
//! URL (superseding the current run) or `{"type":"modification","prompt":...}`.
//!
//! Follows a `tokio::select!` single-loop: pipeline events are forwarded as
//! JSON text frames in emission order, client frames are decoded into
//! [`ClientRequest`]s, and a ping goes out every [`HEARTBEAT_INTERVAL`].
//! Protocol violations are reported with a log event and the socket is
//! closed with code 1011. Disconnecting cancels the in-flight task.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use replica_core::event::EventChannel;
use replica_types::event::{ClientRequest, NotificationEvent};

use crate::state::AppState;

/// Interval between server pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Observer channel buffer. Senders wait when the socket falls behind.
const EVENT_BUFFER: usize = 256;

const INVALID_INITIAL_REQUEST: &str = "Invalid initial request. Expected a URL.";
const TASK_BUSY: &str = "A task is already running. Please wait for it to finish.";

/// Which kind of background task a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Clone,
    Modify,
}

struct ActiveTask {
    kind: TaskKind,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// What the connection loop should do with one client frame.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    StartClone(String),
    StartModify(String),
    RejectBusy,
    IgnoreEmptyPrompt,
    Violation(String),
}

/// Per-connection protocol state.
#[derive(Debug, Default)]
struct SessionGate {
    started: bool,
}

impl SessionGate {
    /// Decide how to handle `text`, given whether a task is still running.
    fn classify(&mut self, text: &str, busy: bool) -> Action {
        let request = ClientRequest::decode(text);

        if !self.started {
            return match request {
                Ok(ClientRequest::Clone { url }) => {
                    self.started = true;
                    Action::StartClone(url)
                }
                _ => Action::Violation(INVALID_INITIAL_REQUEST.to_string()),
            };
        }

        match request {
            Ok(ClientRequest::Clone { url }) => Action::StartClone(url),
            Ok(ClientRequest::Modify { prompt }) if prompt.trim().is_empty() => {
                Action::IgnoreEmptyPrompt
            }
            Ok(ClientRequest::Modify { .. }) if busy => Action::RejectBusy,
            Ok(ClientRequest::Modify { prompt }) => Action::StartModify(prompt),
            Err(e) => Action::Violation(e.to_string()),
        }
    }
}

/// Upgrade an HTTP request to the clone observer WebSocket.
///
/// This is mounted at `/ws/clone` in the router.
pub async fn clone_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_clone_connection(socket, state))
}

async fn handle_clone_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (channel, mut events) = EventChannel::new(EVENT_BUFFER);
    let mut gate = SessionGate::default();
    let mut task: Option<ActiveTask> = None;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately.
    heartbeat.tick().await;

    tracing::info!("observer connected");

    loop {
        tokio::select! {
            // --- Branch 1: Forward pipeline events to the client ---
            Some(event) = events.recv() => {
                match event.encode() {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to encode notification: {err}");
                    }
                }
            }

            // --- Branch 2: Heartbeat ---
            _ = heartbeat.tick() => {
                if ws_sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }

            // --- Branch 3: Client requests ---
            msg_result = ws_receiver.next() => {
                let text = match msg_result {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Binary, ping and pong frames carry no requests.
                    Some(Ok(_)) => continue,
                };

                let busy = task.as_ref().is_some_and(|t| !t.handle.is_finished());
                match gate.classify(text.as_str(), busy) {
                    Action::StartClone(url) => {
                        if let Some(previous) = task.take() {
                            supersede(previous).await;
                        }
                        task = Some(spawn_clone(&state, url, channel.clone()));
                    }
                    Action::StartModify(prompt) => {
                        task = Some(spawn_modify(&state, prompt, channel.clone()));
                    }
                    Action::RejectBusy => {
                        tracing::info!("modification rejected, task still running");
                        if send_log(&mut ws_sender, TASK_BUSY).await.is_err() {
                            break;
                        }
                    }
                    Action::IgnoreEmptyPrompt => {
                        tracing::debug!("ignoring modification request with empty prompt");
                    }
                    Action::Violation(message) => {
                        let raw = text.as_str();
                        tracing::warn!(%raw, %message, "observer protocol violation");
                        let _ = send_log(&mut ws_sender, &message).await;
                        let _ = ws_sender
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::ERROR,
                                reason: "protocol violation".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        }
    }

    if let Some(active) = task {
        if !active.handle.is_finished() {
            tracing::info!(kind = ?active.kind, "observer disconnected, cancelling task");
        }
        active.cancel.cancel();
    }
    tracing::info!("observer connection closed");
}

/// Cancel a running task and wait for it to unwind, so it cannot touch the
/// output directory after the next run resets it.
async fn supersede(previous: ActiveTask) {
    if !previous.handle.is_finished() {
        tracing::info!(kind = ?previous.kind, "new URL received, cancelling current task");
    }
    previous.cancel.cancel();
    if let Err(err) = previous.handle.await {
        tracing::warn!("previous task ended abnormally: {err}");
    }
}

fn spawn_clone(state: &AppState, url: String, channel: EventChannel) -> ActiveTask {
    let orchestrator = state.clone_orchestrator.clone();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        let run = orchestrator.run(&url, &channel, &token).await;
        tracing::debug!(run_id = %run.id, status = %run.status, "clone task finished");
    });
    ActiveTask {
        kind: TaskKind::Clone,
        cancel,
        handle,
    }
}

fn spawn_modify(state: &AppState, prompt: String, channel: EventChannel) -> ActiveTask {
    let orchestrator = state.modify_orchestrator.clone();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => tracing::info!("modification cancelled"),
            result = orchestrator.apply(&prompt, &channel) => {
                if let Ok(outcome) = result {
                    tracing::debug!(?outcome, "modification task finished");
                }
            }
        }
    });
    ActiveTask {
        kind: TaskKind::Modify,
        cancel,
        handle,
    }
}

async fn send_log<S>(ws_sender: &mut S, message: &str) -> Result<(), axum::Error>
where
    S: SinkExt<Message, Error = axum::Error> + Unpin,
{
    let event = NotificationEvent::Log {
        message: message.to_string(),
    };
    match event.encode() {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::warn!("Failed to encode notification: {err}");
            Ok(())
        }
    }
}
