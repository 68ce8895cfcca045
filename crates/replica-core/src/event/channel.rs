//! Ordered notification channel to the connected observer.
//!
//! Built on a bounded `tokio::sync::mpsc` channel: a single consumer (the
//! observer connection) drains events in exactly the order they were sent.
//! Once the consumer is gone every send fails with
//! [`PipelineError::ObserverGone`], which lets a run stop early.

use replica_types::error::PipelineError;
use replica_types::event::{FileChange, NotificationEvent};
use replica_types::pipeline::RunStatus;
use tokio::sync::mpsc;

/// Sender half of the observer channel.
///
/// Cloning shares the underlying channel, so concurrent asset downloads can
/// report through the same ordered stream.
#[derive(Clone)]
pub struct EventChannel {
    sender: mpsc::Sender<NotificationEvent>,
}

impl EventChannel {
    /// Create a channel with the given buffer capacity.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Send one event, waiting for buffer space if the observer lags.
    pub async fn send(&self, event: NotificationEvent) -> Result<(), PipelineError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| PipelineError::ObserverGone)
    }

    /// Human-readable progress line. Mirrored to the server log.
    pub async fn log(&self, message: impl Into<String>) -> Result<(), PipelineError> {
        let message = message.into();
        tracing::info!(target: "replica::observer", "{message}");
        self.send(NotificationEvent::Log { message }).await
    }

    pub async fn ai_token(&self, token: impl Into<String>) -> Result<(), PipelineError> {
        self.send(NotificationEvent::AiToken {
            token: token.into(),
        })
        .await
    }

    pub async fn file_created(
        &self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), PipelineError> {
        self.send(NotificationEvent::FileCreate(FileChange {
            path: path.into(),
            content: content.into(),
            old_content: None,
        }))
        .await
    }

    pub async fn file_updated(
        &self,
        path: impl Into<String>,
        content: impl Into<String>,
        old_content: impl Into<String>,
    ) -> Result<(), PipelineError> {
        self.send(NotificationEvent::FileUpdate(FileChange {
            path: path.into(),
            content: content.into(),
            old_content: Some(old_content.into()),
        }))
        .await
    }

    pub async fn status(&self, status: RunStatus) -> Result<(), PipelineError> {
        tracing::debug!(%status, "run status");
        self.send(NotificationEvent::Status { status }).await
    }

    /// Whether the observer has hung up.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("closed", &self.sender.is_closed())
            .field("capacity", &self.sender.capacity())
            .finish()
    }
}
