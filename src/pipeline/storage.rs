//! Output storage behind a narrow write interface

use parking_lot::Mutex;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write outside the output root: {0}")]
    OutsideRoot(PathBuf),
}

/// Persists bytes at a path relative to the output root
pub trait Storage: Send + Sync {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Reject absolute paths and parent traversal
fn check_relative(path: &Path) -> Result<(), StorageError> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(StorageError::OutsideRoot(path.to_path_buf()));
    }
    Ok(())
}

/// Writes files below a root directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        check_relative(path)?;
        let full_path = self.root.join(path);
        let io_err = |source| StorageError::Io {
            path: full_path.clone(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        // The handle is dropped at the end of this scope, also on error
        let mut file = std::fs::File::create(&full_path).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        trace!("Wrote {} bytes to {}", bytes.len(), full_path.display());
        Ok(())
    }
}

/// A write that would have happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Records intended writes without touching the filesystem
#[derive(Debug, Default)]
pub struct DryRunStorage {
    planned: Mutex<Vec<PlannedWrite>>,
}

impl DryRunStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes recorded so far, in call order
    pub fn planned(&self) -> Vec<PlannedWrite> {
        self.planned.lock().clone()
    }
}

impl Storage for DryRunStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        check_relative(path)?;
        self.planned.lock().push(PlannedWrite {
            path: path.to_path_buf(),
            bytes: bytes.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_storage_creates_parents() {
        let temp = TempDir::new().unwrap();
        let storage = FsStorage::new(temp.path());

        storage
            .write(Path::new("images/posts/p/cover.png"), b"png")
            .unwrap();

        let written = std::fs::read(temp.path().join("images/posts/p/cover.png")).unwrap();
        assert_eq!(written, b"png");
    }

    #[test]
    fn test_fs_storage_overwrites() {
        let temp = TempDir::new().unwrap();
        let storage = FsStorage::new(temp.path());

        storage.write(Path::new("posts/a.md"), b"first").unwrap();
        storage.write(Path::new("posts/a.md"), b"second").unwrap();

        let content = std::fs::read_to_string(temp.path().join("posts/a.md")).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let temp = TempDir::new().unwrap();
        let storage = FsStorage::new(temp.path());

        assert!(matches!(
            storage.write(Path::new("../evil.md"), b"x"),
            Err(StorageError::OutsideRoot(_))
        ));
        assert!(matches!(
            storage.write(Path::new("/etc/evil.md"), b"x"),
            Err(StorageError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_write_failure_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("posts"), b"a file, not a directory").unwrap();
        let storage = FsStorage::new(temp.path());

        let err = storage.write(Path::new("posts/a.md"), b"x").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn test_dry_run_records_only() {
        let temp = TempDir::new().unwrap();
        let storage = DryRunStorage::new();

        storage.write(Path::new("posts/a.md"), b"hello").unwrap();
        storage.write(Path::new("drafts/b.md"), b"hi").unwrap();

        assert_eq!(
            storage.planned(),
            vec![
                PlannedWrite { path: PathBuf::from("posts/a.md"), bytes: 5 },
                PlannedWrite { path: PathBuf::from("drafts/b.md"), bytes: 2 },
            ]
        );
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
