//! Generation stages.
//!
//! Every stage is the same operation parameterized by a [`StageSpec`]: send
//! the input under a fixed system instruction to the configured model, forward
//! each streamed token to the observer, and return the accumulated text once
//! the stream is exhausted. Stages never retry.

pub mod fences;
pub mod prompts;
pub mod summarize;

use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use replica_types::config::StagesConfig;
use replica_types::error::PipelineError;
use replica_types::llm::{CompletionRequest, LlmError, Message, StopReason, StreamEvent};
use replica_types::pipeline::StageKind;

use crate::event::EventChannel;
use crate::llm::box_provider::BoxLlmProvider;

/// System instruction and model selector for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub kind: StageKind,
    pub system_prompt: &'static str,
    pub model: String,
    pub max_tokens: u32,
}

impl StageSpec {
    pub fn from_config(kind: StageKind, stages: &StagesConfig) -> Self {
        let selected = stages.for_stage(kind);
        Self {
            kind,
            system_prompt: prompts::system_prompt(kind),
            model: selected.model.clone(),
            max_tokens: selected.max_tokens,
        }
    }
}

/// One streaming call to the reasoning capability.
pub struct GenerationStage<'a> {
    provider: &'a BoxLlmProvider,
    spec: StageSpec,
    timeout: Option<Duration>,
}

impl<'a> GenerationStage<'a> {
    pub fn new(provider: &'a BoxLlmProvider, spec: StageSpec, timeout: Option<Duration>) -> Self {
        Self {
            provider,
            spec,
            timeout,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.spec.kind
    }

    /// Stream the stage's output, forwarding every token to `channel`.
    ///
    /// Returns the full text. Provider errors, a stream that ends without its
    /// completion marker, a failed observer send, or an exceeded stage timeout
    /// end the stage with an error.
    #[tracing::instrument(
        name = "stage.run",
        skip(self, input, channel),
        fields(
            stage = %self.spec.kind,
            provider = self.provider.name(),
            model = %self.spec.model,
            input_chars = input.len(),
        )
    )]
    pub async fn run(&self, input: &str, channel: &EventChannel) -> Result<String, PipelineError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream_text(input, channel))
                .await
                .map_err(|_| PipelineError::StageTimeout {
                    stage: self.spec.kind.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => self.stream_text(input, channel).await,
        }
    }

    async fn stream_text(&self, input: &str, channel: &EventChannel) -> Result<String, PipelineError> {
        let request = CompletionRequest {
            model: self.spec.model.clone(),
            messages: vec![Message::user(input)],
            system: Some(self.spec.system_prompt.to_string()),
            max_tokens: self.spec.max_tokens,
            temperature: None,
        };

        let mut stream = self.provider.stream(request);
        let mut text = String::new();
        let mut completed = false;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } => {
                    text.push_str(&delta);
                    channel.ai_token(delta).await?;
                }
                StreamEvent::MessageDelta { stop_reason } => {
                    if stop_reason == StopReason::MaxTokens {
                        warn!(max_tokens = self.spec.max_tokens, "stage output truncated at max_tokens");
                    }
                }
                StreamEvent::Usage(usage) => {
                    debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "stage usage"
                    );
                }
                StreamEvent::Connected => {}
                StreamEvent::Done => {
                    completed = true;
                    break;
                }
            }
        }

        if !completed {
            warn!(output_chars = text.len(), "stage stream ended without completion");
            return Err(PipelineError::Capability(LlmError::Stream(
                "stream ended before completion".to_string(),
            )));
        }

        info!(output_chars = text.len(), "stage complete");
        Ok(text)
    }
}
