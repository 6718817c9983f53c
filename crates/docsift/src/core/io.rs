//! File I/O utilities.

use crate::{DocsiftError, Result};
use std::path::Path;
use tokio::fs;

/// Read a file asynchronously.
///
/// # Errors
///
/// Returns `DocsiftError::Io` for I/O errors (these always bubble up).
pub async fn read_file_async(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(path.as_ref()).await.map_err(DocsiftError::Io)
}

/// Read a file synchronously.
pub fn read_file_sync(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    std::fs::read(path.as_ref()).map_err(DocsiftError::Io)
}

/// Validate that a regular file exists at `path`.
///
/// # Errors
///
/// Returns `DocsiftError::NotFound` if nothing exists there or it is a directory.
pub fn validate_file_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DocsiftError::not_found(path.display().to_string()));
    }
    Ok(())
}

/// Base name of a path for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte size with two decimals, e.g. `1.50 KB`.
pub fn size_human(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_file_async() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"test content").unwrap();

        let content = read_file_async(&file_path).await.unwrap();
        assert_eq!(content, b"test content");
    }

    #[test]
    fn test_read_file_sync_missing_is_io() {
        let result = read_file_sync("/nonexistent/file.txt");
        assert!(matches!(result.unwrap_err(), DocsiftError::Io(_)));
    }

    #[test]
    fn test_validate_file_exists() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("here.txt");
        File::create(&file_path).unwrap();

        assert!(validate_file_exists(&file_path).is_ok());
        assert!(matches!(
            validate_file_exists(dir.path().join("gone.txt")).unwrap_err(),
            DocsiftError::NotFound { .. }
        ));
        assert!(validate_file_exists(dir.path()).is_err());
    }

    #[test]
    fn test_size_human() {
        assert_eq!(size_human(512), "512 B");
        assert_eq!(size_human(1536), "1.50 KB");
        assert_eq!(size_human(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/deck.pptx")), "deck.pptx");
    }
}
