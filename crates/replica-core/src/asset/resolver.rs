//! Asset resolver: one dedup map per run, shared by both resolution passes.
//!
//! Pass 1 ([`AssetResolver::resolve`]) runs against the source page's markup
//! and returns the remote -> local mapping injected into the design context.
//! Pass 2 ([`AssetResolver::rewrite`]) runs against the generated markup and
//! rewrites any remaining remote references in place.
//!
//! Claims on the dedup map are made sequentially, before any download
//! starts, so two references to the same absolute URL can never both decide
//! "not yet fetched". Downloads of distinct assets then run concurrently.
//! Fetch failures never escape: they select the placeholder path.

use std::collections::BTreeMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::{StreamExt, stream};
use tracing::{info, warn};
use url::Url;

use replica_types::asset::{AssetOutcome, AssetRecord};
use replica_types::config::{AssetConfig, OutputConfig};
use replica_types::error::PipelineError;

use super::discovery::{AssetReference, discover_references, rewrite_references};
use super::fetcher::{AssetFetcher, PlaceholderRenderer};
use crate::artifact::ArtifactStore;
use crate::event::EventChannel;
use crate::service::hash::ContentHasher;

/// Hex characters of the URL hash used as the file stem.
const HASH_PREFIX_LEN: usize = 10;

/// Longest extension kept from a URL path.
const MAX_EXTENSION_LEN: usize = 5;

/// Which of the two per-run passes is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePass {
    /// Source markup, before generation.
    Prefetch,
    /// Generated markup, after repair.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Absolute mount path of the output directory, e.g. `/preview`.
    pub preview_prefix: String,
    pub default_extension: String,
    pub max_concurrent_fetches: usize,
}

impl ResolverSettings {
    pub fn from_config(output: &OutputConfig, assets: &AssetConfig) -> Self {
        Self {
            preview_prefix: output.preview_mount(),
            default_extension: assets.default_extension.clone(),
            max_concurrent_fetches: assets.max_concurrent_fetches,
        }
    }

    fn assets_prefix(&self) -> String {
        format!("{}/assets/", self.preview_prefix.trim_end_matches('/'))
    }

    fn preview_path(&self, filename: &str) -> String {
        format!("{}{filename}", self.assets_prefix())
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default(), &AssetConfig::default())
    }
}

struct PendingFetch {
    absolute_url: String,
    filename: String,
}

/// Resolves the assets of one clone run.
///
/// Borrows its collaborators; construct one per run and use it for both
/// passes so already-resolved URLs are never downloaded twice.
pub struct AssetResolver<'a, A, F, R, H> {
    store: &'a A,
    fetcher: &'a F,
    placeholder: &'a R,
    hasher: &'a H,
    settings: ResolverSettings,
    records: DashMap<String, AssetRecord>,
}

impl<'a, A, F, R, H> AssetResolver<'a, A, F, R, H>
where
    A: ArtifactStore,
    F: AssetFetcher,
    R: PlaceholderRenderer,
    H: ContentHasher,
{
    pub fn new(
        store: &'a A,
        fetcher: &'a F,
        placeholder: &'a R,
        hasher: &'a H,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            placeholder,
            hasher,
            settings,
            records: DashMap::new(),
        }
    }

    /// Snapshot of every asset resolved so far, ordered by absolute URL.
    pub fn records(&self) -> Vec<AssetRecord> {
        let mut records: Vec<AssetRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.absolute_url.cmp(&b.absolute_url));
        records
    }

    /// Pre-generation pass over the source markup.
    ///
    /// Returns a mapping holding, for every processed reference, both its
    /// absolute URL and the string as written, pointing at the same preview
    /// path. Only observer disconnects are reported as errors.
    #[tracing::instrument(name = "assets.resolve", skip(self, markup, channel), fields(base_url = %base_url))]
    pub async fn resolve(
        &self,
        markup: &str,
        base_url: &str,
        channel: &EventChannel,
    ) -> Result<BTreeMap<String, String>, PipelineError> {
        channel.log("Starting asset prefetch process...").await?;
        let references = discover_references(markup);
        let mapping = self
            .process(&references, base_url, ResolvePass::Prefetch, channel)
            .await?;
        channel
            .log(format!(
                "Asset prefetch complete. Processed {} assets.",
                mapping.len()
            ))
            .await?;
        Ok(mapping)
    }

    /// Post-generation pass: download anything the generated markup still
    /// references remotely and rewrite those references to preview paths.
    #[tracing::instrument(name = "assets.rewrite", skip(self, markup, channel), fields(base_url = %base_url))]
    pub async fn rewrite(
        &self,
        markup: &str,
        base_url: &str,
        channel: &EventChannel,
    ) -> Result<String, PipelineError> {
        channel
            .log("Starting post-processing of remaining assets...")
            .await?;
        let references = discover_references(markup);
        channel
            .log(format!(
                "Found {} image references to check...",
                references.len()
            ))
            .await?;
        let mapping = self
            .process(&references, base_url, ResolvePass::Fallback, channel)
            .await?;
        let rewritten = rewrite_references(markup, &references, |reference| {
            mapping.get(&reference.raw).cloned()
        });
        channel
            .log("Post-processing of remaining assets complete.")
            .await?;
        Ok(rewritten)
    }

    async fn process(
        &self,
        references: &[AssetReference],
        base_url: &str,
        pass: ResolvePass,
        channel: &EventChannel,
    ) -> Result<BTreeMap<String, String>, PipelineError> {
        let base = Url::parse(base_url).ok();
        let mut resolved: Vec<(&AssetReference, String)> = Vec::new();
        let mut pending: Vec<PendingFetch> = Vec::new();

        for reference in references {
            if reference.is_data_uri() {
                continue;
            }
            if pass == ResolvePass::Fallback && self.is_local(reference) {
                continue;
            }
            let absolute = match absolutize(base.as_ref(), &reference.decoded()) {
                Ok(url) => url,
                Err(message) => {
                    warn!(reference = %reference.raw, %message, "skipping asset reference");
                    channel
                        .log(format!(
                            "Skipping invalid asset URL: {} ({message})",
                            reference.raw
                        ))
                        .await?;
                    continue;
                }
            };
            let key = absolute.to_string();

            match self.records.entry(key.clone()) {
                Entry::Occupied(mut existing) => existing.get_mut().add_reference(&reference.raw),
                Entry::Vacant(slot) => {
                    let filename = self.filename_for(&absolute);
                    let mut record =
                        AssetRecord::new(&key, &filename, self.settings.preview_path(&filename));
                    record.add_reference(&reference.raw);
                    slot.insert(record);
                    pending.push(PendingFetch {
                        absolute_url: key.clone(),
                        filename,
                    });
                }
            }
            resolved.push((reference, key));
        }

        if pass == ResolvePass::Prefetch || !pending.is_empty() {
            channel
                .log(format!(
                    "Found {} unique assets to process...",
                    pending.len()
                ))
                .await?;
        }

        let downloads: Vec<Result<(), PipelineError>> = stream::iter(pending)
            .map(|job| self.download(job, pass, channel))
            .buffer_unordered(self.settings.max_concurrent_fetches.max(1))
            .collect()
            .await;
        for result in downloads {
            result?;
        }

        let mut mapping = BTreeMap::new();
        for (reference, key) in resolved {
            if let Some(record) = self.records.get(&key) {
                mapping.insert(key.clone(), record.preview_path.clone());
                mapping.insert(reference.raw.clone(), record.preview_path.clone());
            }
        }
        Ok(mapping)
    }

    async fn download(
        &self,
        job: PendingFetch,
        pass: ResolvePass,
        channel: &EventChannel,
    ) -> Result<(), PipelineError> {
        let label = match pass {
            ResolvePass::Prefetch => "Prefetching asset",
            ResolvePass::Fallback => "Downloading fallback asset",
        };
        channel
            .log(format!("{label}: {}", job.absolute_url))
            .await?;

        let outcome = match self.fetcher.fetch(&job.absolute_url).await {
            Ok(bytes) => match self.store.write_asset(&job.filename, &bytes).await {
                Ok(()) => {
                    info!(
                        url = %job.absolute_url,
                        filename = %job.filename,
                        bytes = bytes.len(),
                        "asset downloaded"
                    );
                    AssetOutcome::Fetched
                }
                Err(e) => {
                    warn!(url = %job.absolute_url, error = %e, "failed to store asset");
                    self.write_placeholder(&job).await
                }
            },
            Err(e) => {
                warn!(url = %job.absolute_url, error = %e, "asset fetch failed");
                channel
                    .log(format!(
                        "Failed to download {}: {e}. Creating placeholder.",
                        job.absolute_url
                    ))
                    .await?;
                self.write_placeholder(&job).await
            }
        };

        if let Some(mut record) = self.records.get_mut(&job.absolute_url) {
            record.outcome = outcome;
        }
        Ok(())
    }

    async fn write_placeholder(&self, job: &PendingFetch) -> AssetOutcome {
        let bytes = self.placeholder.render(&job.filename);
        if let Err(e) = self.store.write_asset(&job.filename, &bytes).await {
            tracing::error!(filename = %job.filename, error = %e, "failed to write placeholder");
        } else {
            info!(filename = %job.filename, "created placeholder");
        }
        AssetOutcome::Placeholder
    }

    fn is_local(&self, reference: &AssetReference) -> bool {
        let value = reference.raw.trim_start();
        value.starts_with(&self.settings.assets_prefix()) || value.starts_with("/assets/")
    }

    fn filename_for(&self, absolute: &Url) -> String {
        let hash = self.hasher.compute_hash(absolute.as_str());
        let stem: String = hash.chars().take(HASH_PREFIX_LEN).collect();
        let extension = extension_of(absolute).unwrap_or_else(|| {
            self.settings
                .default_extension
                .trim_start_matches('.')
                .to_ascii_lowercase()
        });
        format!("{stem}.{extension}")
    }
}

/// Resolve `reference` against `base`, accepting only http(s) results.
fn absolutize(base: Option<&Url>, reference: &str) -> Result<Url, String> {
    let parsed = match base {
        Some(base) => base.join(reference),
        None => Url::parse(reference),
    }
    .map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Lowercased extension of the last path segment, ignoring query strings.
fn extension_of(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, extension) = segment.rsplit_once('.')?;
    let valid = !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LEN
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| extension.to_ascii_lowercase())
}
