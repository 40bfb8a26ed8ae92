use std::io::ErrorKind;
use std::path::Path;

/// Result of removing an asset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Copies a spooled upload from `source` to `path`, truncating any existing
/// file. Returns the number of bytes written.
///
/// A copy rather than a rename, since the spool directory and the asset root
/// are usually on different filesystems.
pub async fn write_asset(path: &Path, source: &Path) -> std::io::Result<u64> {
    let written = tokio::fs::copy(source, path).await?;
    tracing::debug!(path = %path.display(), bytes = written, "Asset written");
    Ok(written)
}

/// Removes `path` if it exists. A missing file is not an error.
pub async fn delete_asset(path: &Path) -> std::io::Result<DeleteOutcome> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Asset deleted");
            Ok(DeleteOutcome::Deleted)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Asset not found, nothing to delete");
            Ok(DeleteOutcome::NotFound)
        }
        Err(e) => Err(e),
    }
}
