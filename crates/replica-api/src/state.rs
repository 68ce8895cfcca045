//! Application state wiring all services together.
//!
//! AppState holds the concrete orchestrators used by both the CLI and the
//! HTTP server. The orchestrators are generic over the core port traits;
//! AppState pins them to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use replica_core::llm::box_provider::BoxLlmProvider;
use replica_core::pipeline::{CloneOrchestrator, ModifyOrchestrator, PipelineSettings};
use replica_infra::artifact::LocalArtifactStore;
use replica_infra::asset::{HttpAssetFetcher, ImagePlaceholderRenderer};
use replica_infra::crypto::hash::Sha256ContentHasher;
use replica_infra::llm::create_provider;
use replica_infra::scrape::HttpPageScraper;
use replica_types::config::ReplicaConfig;

/// Concrete type aliases for the orchestrator generics pinned to infra implementations.
pub type ConcreteCloneOrchestrator = CloneOrchestrator<
    HttpPageScraper,
    LocalArtifactStore,
    HttpAssetFetcher,
    ImagePlaceholderRenderer,
    Sha256ContentHasher,
>;

pub type ConcreteModifyOrchestrator = ModifyOrchestrator<LocalArtifactStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub clone_orchestrator: Arc<ConcreteCloneOrchestrator>,
    pub modify_orchestrator: Arc<ConcreteModifyOrchestrator>,
    pub store: Arc<LocalArtifactStore>,
    pub config: Arc<ReplicaConfig>,
}

impl AppState {
    /// Wire the orchestrators from configuration.
    ///
    /// Fails when no API key is available or an HTTP client cannot be built.
    pub fn init(config: ReplicaConfig, api_key: Option<SecretString>) -> anyhow::Result<Self> {
        let provider = create_provider(&config.llm, api_key).with_context(|| {
            format!(
                "cannot create the AI provider (is {} set?)",
                config.llm.api_key_env
            )
        })?;
        Self::with_provider(config, provider)
    }

    /// Wire the orchestrators around an already-built provider.
    pub fn with_provider(config: ReplicaConfig, provider: BoxLlmProvider) -> anyhow::Result<Self> {
        let store = Arc::new(artifact_store(&config));
        let settings = PipelineSettings::from_config(&config);

        let scraper = HttpPageScraper::new(&config.scraper).context("building page scraper")?;
        let fetcher = HttpAssetFetcher::new(&config.assets).context("building asset fetcher")?;

        let clone_orchestrator = CloneOrchestrator::new(
            provider.clone(),
            scraper,
            store.clone(),
            fetcher,
            ImagePlaceholderRenderer::from_config(&config.assets),
            Sha256ContentHasher::new(),
            settings.clone(),
        );
        let modify_orchestrator = ModifyOrchestrator::new(provider, store.clone(), settings);

        tracing::debug!(output = %store.root().display(), "application state ready");

        Ok(Self {
            clone_orchestrator: Arc::new(clone_orchestrator),
            modify_orchestrator: Arc::new(modify_orchestrator),
            store,
            config: Arc::new(config),
        })
    }
}

/// The artifact store for the configured output directory.
///
/// Usable without an API key (the `files` command only reads).
pub fn artifact_store(config: &ReplicaConfig) -> LocalArtifactStore {
    LocalArtifactStore::new(
        PathBuf::from(&config.output.dir),
        config.output.document_name.clone(),
    )
}
