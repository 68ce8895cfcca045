//! LLM provider implementations.
//!
//! Contains the Anthropic implementation of the [`LlmProvider`] trait
//! defined in `replica-core`, plus a factory ([`create_provider`]) that
//! builds it from configuration.
//!
//! [`LlmProvider`]: replica_core::llm::provider::LlmProvider

pub mod anthropic;

use secrecy::SecretString;

use replica_core::llm::box_provider::BoxLlmProvider;
use replica_types::config::LlmConfig;
use replica_types::llm::LlmError;

use self::anthropic::AnthropicProvider;

/// Create a [`BoxLlmProvider`] from the `[llm]` config section and a
/// resolved API key.
///
/// # Errors
///
/// Returns `AuthenticationFailed` when no key is available.
pub fn create_provider(config: &LlmConfig, api_key: Option<SecretString>) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let mut provider = AnthropicProvider::new(key)?;
    if let Some(base_url) = config.base_url.as_deref() {
        tracing::info!(base_url, "using custom Anthropic base URL");
        provider = provider.with_base_url(base_url);
    }
    Ok(BoxLlmProvider::new(provider))
}
