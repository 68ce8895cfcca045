//! Headless clone and modify commands.
//!
//! Both drive the same orchestrators as the WebSocket endpoint, with the
//! terminal standing in for the observer.

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use replica_core::artifact::ArtifactStore;
use replica_core::event::EventChannel;
use replica_core::pipeline::ModifyOutcome;
use replica_types::event::NotificationEvent;
use replica_types::pipeline::RunStatus;

use super::render::{RenderOptions, print_event};
use crate::state::AppState;

const EVENT_BUFFER: usize = 256;

/// Drain notifications to stdout until every sender is dropped.
fn spawn_printer(mut events: mpsc::Receiver<NotificationEvent>, options: RenderOptions) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event, options);
        }
    })
}

/// `replica clone <url>`: run the pipeline once; Ctrl+C cancels it.
pub async fn clone_page(state: &AppState, url: &str, options: RenderOptions) -> Result<()> {
    let (channel, events) = EventChannel::new(EVENT_BUFFER);
    let printer = spawn_printer(events, options);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let run = state.clone_orchestrator.run(url, &channel, &cancel).await;
    watcher.abort();
    drop(channel);
    if let Err(err) = printer.await {
        tracing::warn!("event printer ended abnormally: {err}");
    }

    match run.status {
        RunStatus::Ready => Ok(()),
        RunStatus::Error => bail!("clone of {url} failed"),
        status => bail!("clone of {url} interrupted (status: {status})"),
    }
}

/// `replica modify <prompt>`: apply one edit to the saved document.
pub async fn modify_page(state: &AppState, prompt: &str, options: RenderOptions) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("modification prompt is empty");
    }

    let (channel, events) = EventChannel::new(EVENT_BUFFER);
    let printer = spawn_printer(events, options);

    let result = state.modify_orchestrator.apply(prompt, &channel).await;
    drop(channel);
    if let Err(err) = printer.await {
        tracing::warn!("event printer ended abnormally: {err}");
    }

    match result? {
        ModifyOutcome::Applied { .. } => Ok(()),
        ModifyOutcome::NotFound => bail!(
            "no {} to modify; run `replica clone <url>` first",
            state.store.document_name()
        ),
    }
}
