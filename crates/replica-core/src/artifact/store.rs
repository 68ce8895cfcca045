//! Artifact store trait.
//!
//! The artifact is the generated project: one markup document plus an
//! `assets/` directory. Writes are whole-file replacements; the document is
//! never observable half-written. Implementations live in replica-infra.

use replica_types::error::ArtifactError;

/// Trait for the on-disk project produced by a clone run.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ArtifactStore: Send + Sync {
    /// File name of the markup document (e.g. `index.html`).
    fn document_name(&self) -> &str;

    /// Clear the output directory and recreate it empty (with `assets/`).
    fn reset(&self) -> impl std::future::Future<Output = Result<(), ArtifactError>> + Send;

    /// Atomically replace the markup document.
    fn write_document(
        &self,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), ArtifactError>> + Send;

    /// Read the markup document, or `None` if no run has produced one.
    fn read_document(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<String>, ArtifactError>> + Send;

    /// Write an asset's bytes verbatim under `assets/`.
    fn write_asset(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<(), ArtifactError>> + Send;

    /// Every regular file under the output directory, as sorted relative
    /// paths with `/` separators.
    fn list_files(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ArtifactError>> + Send;

    /// Text content of one file, by relative path.
    ///
    /// Fails with `NotFound` for missing or non-regular files and with
    /// `InvalidPath` for paths that would escape the output directory.
    fn read_file(
        &self,
        relative_path: &str,
    ) -> impl std::future::Future<Output = Result<String, ArtifactError>> + Send;
}
