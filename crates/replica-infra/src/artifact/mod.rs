//! Artifact store adapters.

pub mod local;

pub use local::{ListingEntry, LocalArtifactStore};
