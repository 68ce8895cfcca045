//! Shared domain types for Replica.
//!
//! This crate contains the types threaded through the clone/modify pipeline:
//! observer notifications and requests, run lifecycle, the design context,
//! asset records, LLM request/stream shapes, configuration, and error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod asset;
pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod pipeline;
