//! LlmProvider trait definition.
//!
//! The only shape the pipeline needs from the reasoning capability: stream
//! text for a prompt under a system instruction and a model selector.

use std::pin::Pin;

use futures_util::Stream;

use replica_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// Trait for LLM provider backends.
///
/// `stream` returns a boxed stream so the trait stays object-safe for
/// `BoxLlmProvider`. Implementations live in replica-infra
/// (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a streaming completion request. Returns a stream of events.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
