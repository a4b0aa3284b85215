//! File system abstraction for testability.

use async_trait::async_trait;
use std::path::Path;

/// Abstraction over the file system operations the asset server performs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if anything exists at the given path.
    async fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file into memory.
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tokio_fs_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::File::create(&path).unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.exists(&path).await);
        assert!(fs.exists(dir.path()).await);
        assert!(!fs.exists(&dir.path().join("nonexistent.txt")).await);
    }

    #[tokio::test]
    async fn tokio_fs_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();

        let fs = TokioFileSystem::new();
        assert_eq!(fs.read(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn tokio_fs_read_directory_fails() {
        let dir = TempDir::new().unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.read(dir.path()).await.is_err());
    }
}
