//! Filesystem helpers shared by the bundle and link commands

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copy a file or directory tree, creating destination directories as needed.
///
/// A file source copies to the destination path; a directory source merges
/// into the destination like `cp -R src/. dst/`.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    tracing::debug!("copying {} to {}", src.display(), dst.display());
    if src.is_file() {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, dst)?;
        return Ok(());
    }
    if !src.is_dir() {
        return Err(Error::file_not_found(src));
    }
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| Error::io(format!("walk {}: {}", src.display(), e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::io(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove every file or directory under `dir` matching one of the glob
/// patterns (patterns are relative to `dir`).
pub fn remove_matching(dir: &Path, patterns: &[String]) -> Result<usize> {
    let mut removed = 0;
    for pattern in patterns {
        let full = dir.join(pattern);
        let matches = glob::glob(&full.to_string_lossy())?;
        for entry in matches {
            let path = entry.map_err(|e| Error::io(e.to_string()))?;
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            removed += 1;
        }
    }
    Ok(removed)
}

/// Collect files under `dir` with the given extension (no leading dot)
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |x| x.eq_ignore_ascii_case(ext))
        })
        .map(|e| e.into_path())
        .collect()
}

/// Check a file name against a set of glob patterns
pub fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| {
        glob::Pattern::new(p)
            .map(|pat| pat.matches(name))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_tree_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.py");
        std::fs::write(&src, "print('hi')").unwrap();

        let dst = dir.path().join("nested/out/a.py");
        copy_tree(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "print('hi')");
    }

    #[test]
    fn test_copy_tree_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("pkg")).unwrap();
        std::fs::write(src.join("main.py"), "x").unwrap();
        std::fs::write(src.join("pkg/mod.py"), "y").unwrap();

        let dst = dir.path().join("build");
        copy_tree(&src, &dst).unwrap();
        assert!(dst.join("main.py").exists());
        assert!(dst.join("pkg/mod.py").exists());
    }

    #[test]
    fn test_remove_matching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.py"), "").unwrap();
        std::fs::write(dir.path().join("a.pyc"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("demo.dist-info")).unwrap();

        let removed = remove_matching(
            dir.path(),
            &["*.pyc".to_string(), "*.dist-info".to_string()],
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join("keep.py").exists());
        assert!(!dir.path().join("a.pyc").exists());
        assert!(!dir.path().join("demo.dist-info").exists());
    }

    #[test]
    fn test_files_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.so"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let found = files_with_extension(dir.path(), "so");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_matches_any() {
        let patterns = vec!["libssl*".to_string(), "*.pyc".to_string()];
        assert!(matches_any("libssl.so.3", &patterns));
        assert!(matches_any("cache.pyc", &patterns));
        assert!(!matches_any("libpython3.10.so", &patterns));
    }
}
