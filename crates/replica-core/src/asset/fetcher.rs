//! Asset fetching and placeholder synthesis traits.
//!
//! Implementations live in replica-infra (`HttpAssetFetcher`,
//! `ImagePlaceholderRenderer`).

use replica_types::error::FetchError;

/// Downloads one remote asset.
///
/// Implementations bound every request with a timeout and follow redirects.
pub trait AssetFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Synthesizes a stand-in image for an asset that could not be fetched.
///
/// Infallible: the resolver must always be able to write something at the
/// asset's deterministic path.
pub trait PlaceholderRenderer: Send + Sync {
    /// Encoded image bytes labelled with `filename`, in the format its
    /// extension implies.
    fn render(&self, filename: &str) -> Vec<u8>;
}
