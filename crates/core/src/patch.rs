//! Transactional text-file patching
//!
//! The link/unlink and ndk commands edit several build files in sequence.
//! `FileTransaction` captures the original bytes of every touched file so a
//! failure anywhere in the sequence restores all of them before the error
//! propagates. Not crash-atomic: a process crash between capture and restore
//! leaves partial edits.

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory log of original file contents for a multi-file patch sequence
#[derive(Debug, Default)]
pub struct FileTransaction {
    originals: HashMap<PathBuf, Option<String>>,
}

impl FileTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file, capturing its contents for rollback on first touch
    pub fn read(&mut self, path: &Path) -> Result<String> {
        let contents = std::fs::read_to_string(path)?;
        self.originals
            .entry(path.to_path_buf())
            .or_insert_with(|| Some(contents.clone()));
        Ok(contents)
    }

    /// Write a file, capturing the previous contents on first touch
    pub fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        if !self.originals.contains_key(path) {
            let original = match std::fs::read_to_string(path) {
                Ok(text) => Some(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            self.originals.insert(path.to_path_buf(), original);
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Restore every touched file to its captured contents.
    ///
    /// Files that did not exist before the transaction are removed. Restore
    /// errors are logged and skipped so the remaining files still revert.
    pub fn rollback(&mut self) {
        for (path, original) in self.originals.drain() {
            let outcome = match original {
                Some(text) => std::fs::write(&path, text),
                None => std::fs::remove_file(&path),
            };
            if let Err(e) = outcome {
                tracing::warn!("Failed to restore {}: {}", path.display(), e);
            }
        }
    }

    /// Drop the captured originals, keeping the edits in place
    pub fn commit(&mut self) {
        self.originals.clear();
    }

    /// Number of files captured so far
    pub fn touched(&self) -> usize {
        self.originals.len()
    }

    /// Run a patch sequence with rollback-on-error semantics
    pub fn run<T>(f: impl FnOnce(&mut FileTransaction) -> Result<T>) -> Result<T> {
        let mut tx = FileTransaction::new();
        match f(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_rollback_restores_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.gradle");
        std::fs::write(&file, "include ':app'\n").unwrap();

        let mut tx = FileTransaction::new();
        tx.write(&file, "include ':app'\ninclude ':pkg'\n").unwrap();
        assert!(std::fs::read_to_string(&file).unwrap().contains(":pkg"));

        tx.rollback();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "include ':app'\n");
    }

    #[test]
    fn test_rollback_removes_created_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new.gradle");

        let mut tx = FileTransaction::new();
        tx.write(&file, "fresh").unwrap();
        assert!(file.exists());

        tx.rollback();
        assert!(!file.exists());
    }

    #[test]
    fn test_commit_keeps_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("build.gradle");
        std::fs::write(&file, "old").unwrap();

        let mut tx = FileTransaction::new();
        tx.write(&file, "new").unwrap();
        tx.commit();
        tx.rollback(); // no captured state left

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new");
    }

    #[test]
    fn test_run_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "a0").unwrap();
        std::fs::write(&b, "b0").unwrap();

        let result: Result<()> = FileTransaction::run(|tx| {
            tx.write(&a, "a1")?;
            tx.write(&b, "b1")?;
            Err(Error::link("boom"))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "a0");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "b0");
    }

    #[test]
    fn test_first_capture_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "original").unwrap();

        let mut tx = FileTransaction::new();
        tx.write(&file, "first").unwrap();
        tx.write(&file, "second").unwrap();
        tx.rollback();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "original");
    }
}
