//! Clone orchestrator.
//!
//! Sequences one run: scrape, sanitize, asset pass 1, summarize, analyze,
//! generate, repair, asset pass 2, persist. Stages run strictly one after
//! another; each prompt is built from the previous stage's complete output.
//!
//! Lifecycle: the run enters `generating` before any work begins, becomes
//! `ready` only after the document write succeeds, and becomes `error` on
//! the first failure. A run cancelled through its token (observer gone)
//! emits no terminal status.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use replica_types::error::{PipelineError, ScrapeError};
use replica_types::pipeline::{DesignContext, PipelineRun, RunStatus, StageKind};

use super::{PipelineSettings, analysis_payload, generation_payload, parse_section_plan};
use crate::artifact::ArtifactStore;
use crate::asset::{AssetFetcher, AssetResolver, PlaceholderRenderer};
use crate::event::EventChannel;
use crate::llm::box_provider::BoxLlmProvider;
use crate::sanitize::strip_scripts;
use crate::scrape::{PageScraper, ScrapeSession};
use crate::service::hash::ContentHasher;
use crate::stage::summarize::{Summarizer, needs_summary};
use crate::stage::{GenerationStage, StageSpec};

/// Drives clone runs. One instance serves every run of the process.
pub struct CloneOrchestrator<S, A, F, R, H> {
    provider: BoxLlmProvider,
    scraper: S,
    store: Arc<A>,
    fetcher: F,
    placeholder: R,
    hasher: H,
    settings: PipelineSettings,
}

impl<S, A, F, R, H> CloneOrchestrator<S, A, F, R, H>
where
    S: PageScraper,
    A: ArtifactStore,
    F: AssetFetcher,
    R: PlaceholderRenderer,
    H: ContentHasher,
{
    pub fn new(
        provider: BoxLlmProvider,
        scraper: S,
        store: Arc<A>,
        fetcher: F,
        placeholder: R,
        hasher: H,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            scraper,
            store,
            fetcher,
            placeholder,
            hasher,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<A> {
        &self.store
    }

    /// Execute one clone run for `url`, reporting to `channel`.
    ///
    /// Never fails: the outcome is the returned run's status. Cancelling
    /// `cancel` abandons the run at its next suspension point.
    #[tracing::instrument(name = "clone.run", skip(self, channel, cancel), fields(url = %url))]
    pub async fn run(&self, url: &str, channel: &EventChannel, cancel: &CancellationToken) -> PipelineRun {
        let mut run = PipelineRun::new(url);
        info!(run_id = %run.id, "clone run started");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.execute(&mut run, channel) => Some(result),
        };

        match outcome {
            None => info!(run_id = %run.id, status = %run.status, "clone run cancelled"),
            Some(result) => self.finish(&mut run, result, channel).await,
        }
        run
    }

    async fn finish(
        &self,
        run: &mut PipelineRun,
        result: Result<String, PipelineError>,
        channel: &EventChannel,
    ) {
        match result {
            Ok(markup) => {
                run.final_markup = Some(markup);
                if let Err(e) = run.transition(RunStatus::Ready) {
                    error!(run_id = %run.id, error = %e, "unexpected run state");
                    return;
                }
                let preview = format!(
                    "{}/{}",
                    self.settings.resolver.preview_prefix,
                    self.store.document_name()
                );
                let _ = channel.status(RunStatus::Ready).await;
                let _ = channel
                    .log(format!("Cloning complete! Preview at {preview}"))
                    .await;
                info!(run_id = %run.id, "clone run complete");
            }
            Err(e) if e.is_silent() => {
                info!(run_id = %run.id, reason = %e, "clone run abandoned");
            }
            Err(e) => {
                error!(run_id = %run.id, error = %e, "clone run failed");
                if run.transition(RunStatus::Error).is_err() {
                    warn!(run_id = %run.id, status = %run.status, "failure before run started");
                }
                let _ = channel.status(RunStatus::Error).await;
                let _ = channel.log(format!("Error: {e}")).await;
            }
        }
    }

    async fn execute(&self, run: &mut PipelineRun, channel: &EventChannel) -> Result<String, PipelineError> {
        run.transition(RunStatus::Generating)?;
        channel.status(RunStatus::Generating).await?;
        channel.log("Starting website cloning process...").await?;

        let target = validate_target(&run.target_url)?;

        channel.log("Cleaning output directory...").await?;
        self.store.reset().await?;

        let mut ctx = self.scrape(&target, channel).await?;

        channel.log("Sanitizing HTML content...").await?;
        ctx.dom_tree = strip_scripts(&ctx.dom_tree);

        let resolver = AssetResolver::new(
            self.store.as_ref(),
            &self.fetcher,
            &self.placeholder,
            &self.hasher,
            self.settings.resolver.clone(),
        );
        channel.log("Prefetching assets...").await?;
        ctx.assets = resolver.resolve(&ctx.dom_tree, &ctx.page_url, channel).await?;

        if needs_summary(&ctx.dom_tree, &self.settings.summarize) {
            channel.log("Starting DOM summarization...").await?;
            let summarizer =
                Summarizer::new(self.stage(StageKind::Summarize), self.settings.summarize.clone());
            ctx.dom_tree = summarizer.summarize(&ctx.dom_tree, channel).await?;
            channel.log("DOM summarization complete.").await?;
        }

        channel.log("AI: analysing layout...").await?;
        let plan_text = self
            .stage(StageKind::Analyze)
            .run(&analysis_payload(&ctx), channel)
            .await?;
        channel.log("Design analysis complete.").await?;
        let plan = parse_section_plan(&plan_text)?;
        info!(sections = plan.len(), "section plan parsed");

        channel.log("AI: generating Tailwind HTML...").await?;
        let generated = self
            .stage(StageKind::Generate)
            .run(&generation_payload(&plan, &ctx), channel)
            .await?;
        channel.log("HTML generation complete.").await?;

        channel.log("AI: fixing potential HTML errors...").await?;
        let repaired = self.stage(StageKind::Repair).run(&generated, channel).await?;
        channel.log("HTML bug-fix pass complete.").await?;

        channel.log("Post-processing assets (images)...").await?;
        let final_markup = resolver.rewrite(&repaired, &ctx.page_url, channel).await?;

        channel.log("Writing final HTML file...").await?;
        self.store.write_document(&final_markup).await?;
        channel
            .file_created(self.store.document_name(), final_markup.as_str())
            .await?;

        Ok(final_markup)
    }

    /// Gather the design context through one scrape session.
    async fn scrape(&self, target: &Url, channel: &EventChannel) -> Result<DesignContext, PipelineError> {
        channel.log("Connecting to page scraper...").await?;
        let mut session = self.scraper.connect().await?;

        let gathered = gather(&mut session, target.as_str(), channel).await;

        if let Err(e) = session.disconnect().await {
            warn!(error = %e, "scraper disconnect failed");
        }
        let ctx = gathered?;
        channel.log("Closed scraper session.").await?;
        Ok(ctx)
    }

    fn stage(&self, kind: StageKind) -> GenerationStage<'_> {
        GenerationStage::new(
            &self.provider,
            StageSpec::from_config(kind, &self.settings.stages),
            self.settings.stage_timeout,
        )
    }
}

async fn gather<T: ScrapeSession>(
    session: &mut T,
    url: &str,
    channel: &EventChannel,
) -> Result<DesignContext, PipelineError> {
    channel.log(format!("Navigating to {url}...")).await?;
    session.navigate(url).await?;

    channel.log("Gathering design context...").await?;
    channel.log("Taking screenshot...").await?;
    let viewport_screenshot = match session.screenshot(url, true).await {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(ScrapeError::Unsupported(_)) => {
            channel
                .log("Screenshot not available, continuing without it.")
                .await?;
            None
        }
        Err(e) => return Err(e.into()),
    };

    channel.log("Inspecting DOM structure...").await?;
    let dom_tree = session.inspect_dom(url, "html", true, true).await?;

    channel.log("Running enhanced page analysis...").await?;
    let analysis = session.analyze_page(url, true, true).await?;

    channel.log("Building design context...").await?;
    Ok(DesignContext {
        page_url: url.to_string(),
        viewport_screenshot,
        dom_tree,
        analysis,
        assets: BTreeMap::new(),
    })
}

/// Parse and check the clone target: absolute http(s) URL with a host.
pub fn validate_target(url: &str) -> Result<Url, PipelineError> {
    let invalid = |message: String| PipelineError::InvalidUrl {
        url: url.to_string(),
        message,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}
