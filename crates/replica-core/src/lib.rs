//! Clone/modify pipeline and port trait definitions for Replica.
//!
//! This crate defines the "ports" (LLM provider, page scraper, asset fetcher,
//! placeholder renderer, content hasher, artifact store) that the
//! infrastructure layer implements, plus the orchestration that drives them.
//! It depends only on `replica-types` -- never on `replica-infra` or any
//! network/filesystem crate.

pub mod artifact;
pub mod asset;
pub mod event;
pub mod llm;
pub mod pipeline;
pub mod sanitize;
pub mod scrape;
pub mod service;
pub mod stage;

#[cfg(test)]
pub(crate) mod testing;
