//! Local-disk artifact store.
//!
//! Directory layout:
//! ```text
//! {root}/
//!   index.html
//!   assets/
//!     3f2a9c01de.png
//!     ...
//! ```
//!
//! Whole-file writes go to a sibling temp file first and are renamed into
//! place, so readers (the preview mount, the file endpoints) never see a
//! partially written document.

use std::path::{Component, Path, PathBuf};

use replica_core::artifact::ArtifactStore;
use replica_types::error::ArtifactError;

/// Name of the asset subdirectory.
pub const ASSETS_DIR: &str = "assets";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

pub struct LocalArtifactStore {
    root: PathBuf,
    document_name: String,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, document_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            document_name: document_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self) -> PathBuf {
        self.root.join(&self.document_name)
    }

    /// Resolve a client-supplied relative path under the root.
    ///
    /// Only normal components are accepted: absolute paths, `..`, and
    /// drive prefixes are rejected.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, ArtifactError> {
        let relative = Path::new(relative_path);
        if relative_path.is_empty() {
            return Err(ArtifactError::InvalidPath(relative_path.to_string()));
        }
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(ArtifactError::InvalidPath(relative_path.to_string())),
            }
        }
        Ok(resolved)
    }

    /// Entries of one directory under the root (`""` is the root itself),
    /// directories first, then by name. Temp files are hidden.
    pub async fn list_dir(&self, relative_path: &str) -> Result<Vec<ListingEntry>, ArtifactError> {
        let dir = if relative_path.is_empty() {
            self.root.clone()
        } else {
            self.resolve(relative_path)?
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(ArtifactError::NotFound(relative_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_name(&name) {
                continue;
            }
            let is_dir = entry.file_type().await?.is_dir();
            listing.push(ListingEntry { name, is_dir });
        }
        listing.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(listing)
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

/// Write `bytes` to `path` via a temp file and rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArtifactError::InvalidPath(path.display().to_string()))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn is_valid_asset_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
}

impl ArtifactStore for LocalArtifactStore {
    fn document_name(&self) -> &str {
        &self.document_name
    }

    async fn reset(&self) -> Result<(), ArtifactError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(self.root.join(ASSETS_DIR)).await?;
        tracing::debug!(root = %self.root.display(), "output directory reset");
        Ok(())
    }

    async fn write_document(&self, content: &str) -> Result<(), ArtifactError> {
        write_atomic(&self.document_path(), content.as_bytes()).await
    }

    async fn read_document(&self) -> Result<Option<String>, ArtifactError> {
        match tokio::fs::read_to_string(self.document_path()).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_asset(&self, filename: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        if !is_valid_asset_name(filename) {
            return Err(ArtifactError::InvalidPath(filename.to_string()));
        }
        write_atomic(&self.root.join(ASSETS_DIR).join(filename), bytes).await
    }

    async fn list_files(&self) -> Result<Vec<String>, ArtifactError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let Ok(relative) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    if parts.iter().any(|p| is_temp_name(p)) {
                        continue;
                    }
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read_file(&self, relative_path: &str) -> Result<String, ArtifactError> {
        let path = self.resolve(relative_path)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(relative_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(ArtifactError::NotFound(relative_path.to_string()));
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
