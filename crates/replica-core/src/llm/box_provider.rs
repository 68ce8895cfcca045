//! BoxLlmProvider -- shared, type-erased handle to an `LlmProvider`.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use replica_types::llm::{CompletionRequest, LlmError, StreamEvent};

use super::provider::LlmProvider;

/// Type-erased LLM provider for runtime provider selection.
///
/// Cheap to clone: every clone shares the same underlying provider, so one
/// HTTP client serves every run spawned by the server.
#[derive(Clone)]
pub struct BoxLlmProvider {
    inner: Arc<dyn LlmProvider>,
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider`.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a streaming completion request. Returns a stream of events.
    pub fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.inner.stream(request)
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxLlmProvider")
            .field("name", &self.inner.name())
            .finish()
    }
}
