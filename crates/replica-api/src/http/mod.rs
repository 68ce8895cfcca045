//! HTTP layer for Replica.
//!
//! Axum router with the artifact file endpoints, the read-only preview
//! mount, and the `/ws/clone` observer socket.

pub mod error;
pub mod handlers;
pub mod router;
