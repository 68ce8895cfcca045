//! Anthropic Claude LLM provider implementation.
//!
//! This module provides the [`AnthropicProvider`] which implements the
//! [`LlmProvider`](replica_core::llm::provider::LlmProvider) trait for
//! the Anthropic Messages API over SSE.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicProvider;
