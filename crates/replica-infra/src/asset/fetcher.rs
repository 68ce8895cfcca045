//! reqwest-backed [`AssetFetcher`].

use std::time::Duration;

use replica_core::asset::AssetFetcher;
use replica_types::config::AssetConfig;
use replica_types::error::FetchError;

/// Downloads assets over HTTP with a per-request timeout.
///
/// Redirects are followed (reqwest's default policy, up to 10 hops). Any
/// non-2xx final status is a failure.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(config: &AssetConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_error)?;
        tracing::debug!(url, bytes = bytes.len(), "asset downloaded");
        Ok(bytes.to_vec())
    }
}

fn map_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(err.to_string())
    }
}
