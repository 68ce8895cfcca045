//! ContentHasher trait for deriving deterministic asset names.
//!
//! Defined in replica-core so the asset resolver can hash URLs without
//! coupling to a specific algorithm. The `Sha256ContentHasher` adapter lives
//! in replica-infra.

/// Abstraction over content hashing.
///
/// Used by the asset resolver to derive a local file name from an absolute
/// URL, so the same URL maps to the same file across runs.
pub trait ContentHasher: Send + Sync {
    /// Compute a lowercase hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
