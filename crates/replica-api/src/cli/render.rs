//! Terminal rendering of pipeline notifications.

use std::io::Write;

use console::style;

use replica_types::event::NotificationEvent;
use replica_types::pipeline::RunStatus;

/// How notifications are written to stdout.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// One JSON object per line, exactly as the WebSocket observer sees them.
    pub json: bool,
    /// Echo `ai_token` events in styled mode.
    pub show_tokens: bool,
}

/// Styled line for one notification, or `None` when it is not shown.
///
/// Tokens are returned without a trailing newline so they can be printed
/// back to back.
pub fn format_event(event: &NotificationEvent, show_tokens: bool) -> Option<String> {
    match event {
        NotificationEvent::Log { message } => {
            let marker = if message.starts_with("Error") || message.starts_with("AI Error") {
                style("✗").red().to_string()
            } else {
                style("›").dim().to_string()
            };
            Some(format!("  {marker} {message}"))
        }
        NotificationEvent::AiToken { token } => show_tokens.then(|| style(token).dim().to_string()),
        NotificationEvent::FileCreate(change) => Some(format!(
            "  {} Created {} ({} bytes)",
            style("✓").green(),
            style(&change.path).cyan(),
            change.content.len()
        )),
        NotificationEvent::FileUpdate(change) => Some(format!(
            "  {} Updated {} ({} -> {} bytes)",
            style("✓").green(),
            style(&change.path).cyan(),
            change.old_content.as_deref().map_or(0, str::len),
            change.content.len()
        )),
        NotificationEvent::Status { status } => {
            let label = match status {
                RunStatus::Ready => style(status.to_string()).green().bold(),
                RunStatus::Error => style(status.to_string()).red().bold(),
                _ => style(status.to_string()).yellow(),
            };
            Some(format!("  {} Status: {label}", style("●").bold()))
        }
    }
}

/// Write one notification to stdout.
pub fn print_event(event: &NotificationEvent, options: RenderOptions) {
    if options.json {
        match event.encode() {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!("Failed to encode notification: {err}"),
        }
        return;
    }

    let is_token = matches!(event, NotificationEvent::AiToken { .. });
    if let Some(line) = format_event(event, options.show_tokens) {
        if is_token {
            print!("{line}");
            let _ = std::io::stdout().flush();
        } else {
            println!("{line}");
        }
    }
}
