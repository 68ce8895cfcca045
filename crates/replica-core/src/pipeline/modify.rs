//! Natural-language edits to the saved document.

use std::sync::Arc;

use tracing::{error, info};

use replica_types::error::PipelineError;
use replica_types::pipeline::StageKind;

use super::{PipelineSettings, modification_payload};
use crate::artifact::ArtifactStore;
use crate::event::EventChannel;
use crate::llm::box_provider::BoxLlmProvider;
use crate::stage::fences::strip_code_fences;
use crate::stage::{GenerationStage, StageSpec};

/// Result of one modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// The document was rewritten.
    Applied { old: String, new: String },
    /// There was no document to modify; nothing changed.
    NotFound,
}

pub struct ModifyOrchestrator<A> {
    provider: BoxLlmProvider,
    store: Arc<A>,
    settings: PipelineSettings,
}

impl<A: ArtifactStore> ModifyOrchestrator<A> {
    pub fn new(provider: BoxLlmProvider, store: Arc<A>, settings: PipelineSettings) -> Self {
        Self {
            provider,
            store,
            settings,
        }
    }

    /// Apply `instruction` to the saved document.
    ///
    /// Failures are reported to the observer as a log line before being
    /// returned; the run status is never touched.
    #[tracing::instrument(name = "modify.apply", skip(self, instruction, channel), fields(instruction_chars = instruction.len()))]
    pub async fn apply(&self, instruction: &str, channel: &EventChannel) -> Result<ModifyOutcome, PipelineError> {
        let result = self.execute(instruction, channel).await;
        if let Err(e) = &result {
            if e.is_silent() {
                info!(reason = %e, "modification abandoned");
            } else {
                error!(error = %e, "modification failed");
                let message = match e {
                    PipelineError::Capability(inner) => format!("AI Error: {inner}"),
                    other => format!("Error during modification: {other}"),
                };
                let _ = channel.log(message).await;
            }
        }
        result
    }

    async fn execute(&self, instruction: &str, channel: &EventChannel) -> Result<ModifyOutcome, PipelineError> {
        channel.log("Starting code modification process...").await?;

        let document_name = self.store.document_name();
        let Some(current) = self.store.read_document().await? else {
            channel
                .log(format!("Error: {document_name} not found to modify."))
                .await?;
            return Ok(ModifyOutcome::NotFound);
        };

        channel
            .log(format!("Applying modification: '{instruction}'..."))
            .await?;
        channel.log("Sending modification request to AI...").await?;

        let stage = GenerationStage::new(
            &self.provider,
            StageSpec::from_config(StageKind::Modify, &self.settings.stages),
            self.settings.stage_timeout,
        );
        let response = stage
            .run(&modification_payload(instruction, &current), channel)
            .await?;

        channel.log("Processing AI response...").await?;
        let updated = strip_code_fences(&response);

        channel.log("Writing modified content to file...").await?;
        self.store.write_document(&updated).await?;
        channel
            .file_updated(document_name, updated.as_str(), current.as_str())
            .await?;
        channel.log("Modification complete!").await?;

        Ok(ModifyOutcome::Applied {
            old: current,
            new: updated,
        })
    }
}
