//! Infrastructure layer for Replica.
//!
//! Contains implementations of the port traits defined in `replica-core`:
//! the Anthropic streaming provider, the HTTP asset fetcher and page scraper,
//! the image placeholder renderer, the local-disk artifact store, SHA-256
//! hashing, and the TOML configuration loader.

pub mod artifact;
pub mod asset;
pub mod config;
pub mod crypto;
pub mod llm;
pub mod scrape;

#[cfg(test)]
pub(crate) mod test_support;
