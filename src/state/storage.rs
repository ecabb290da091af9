//! File storage used for recordings and their sidecars

use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The file operations the engine needs from durable storage
pub trait Storage: Send + Sync {
    /// List the entries of a directory
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn unlink(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// `Storage` on the local file system
#[derive(Clone, Copy, Debug, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                // Capture temp files may live on another device
                if !from.exists() {
                    return Err(rename_err);
                }
                debug!(
                    "rename {:?} -> {:?} failed ({}), falling back to copy",
                    from,
                    to,
                    rename_err
                );
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
        }
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_move_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new();
        let a = dir.path().join("nested").join("a.txt");
        let b = dir.path().join("b.txt");

        storage.write_file(&a, "hello").unwrap();
        assert!(storage.exists(&a));
        assert_eq!(storage.read_file(&a).unwrap(), "hello");

        storage.move_file(&a, &b).unwrap();
        assert!(!storage.exists(&a));
        assert_eq!(storage.read_file(&b).unwrap(), "hello");

        storage.unlink(&b).unwrap();
        assert!(!storage.exists(&b));
    }

    #[test]
    fn test_move_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new();
        let result = storage.move_file(&dir.path().join("nope"), &dir.path().join("dest"));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_dir_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new();
        storage.write_file(&dir.path().join("x.wav"), "").unwrap();
        storage.write_file(&dir.path().join("y.wav"), "").unwrap();

        let mut entries = storage.read_dir(dir.path()).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![dir.path().join("x.wav"), dir.path().join("y.wav")]
        );
    }
}
