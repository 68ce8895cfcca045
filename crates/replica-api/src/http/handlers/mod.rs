//! HTTP and WebSocket request handlers.

pub mod clone_ws;
pub mod files;
pub mod preview;
