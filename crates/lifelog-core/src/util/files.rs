//! File utilities shared by the Lifelog crates.
//!
//! Snapshot files are never written in place: contents go to a temporary
//! sibling in the same directory, which is then renamed over the target.
//! A crash mid-write leaves the previous file untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// A file written to a temporary sibling, waiting to be renamed into place.
///
/// Dropping a `StagedWrite` without calling [`commit`](StagedWrite::commit)
/// deletes the temporary file and leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// The file this write will replace.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temporary file over the target.
    pub fn commit(self) -> Result<()> {
        let Self { tmp, target } = self;
        tmp.persist(&target)
            .map_err(|e| Error::io_with_path(e.error, &target))?;
        Ok(())
    }
}

/// Write `contents` next to `path` without touching `path` itself.
///
/// The temporary file is created in the target's directory so the final
/// rename never crosses a filesystem boundary.
///
/// # Errors
///
/// Returns [`Error::IoWithPath`] if the directory is missing or not
/// writable.
pub fn stage_write(path: impl AsRef<Path>, contents: &[u8]) -> Result<StagedWrite> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io_with_path(e, dir))?;
    tmp.write_all(contents)
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;

    log::debug!("Staged {} bytes for {}", contents.len(), path.display());
    Ok(StagedWrite {
        tmp,
        target: path.to_path_buf(),
    })
}

/// Write `contents` to `path` atomically.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    stage_write(path, contents)?.commit()
}

/// Return the subset of `paths` that do not exist on disk, in input order.
pub fn missing_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.exists())
        .map(Path::to_path_buf)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("texts.json");

        write_atomic(&path, b"[\"hello\"]").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[\"hello\"]");
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");

        write_atomic(&path, b"old contents").unwrap();
        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");

        write_atomic(&path, &[1, 2, 3]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("file.bin");

        let err = write_atomic(&path, b"x").unwrap_err();
        assert!(matches!(err, Error::IoWithPath { .. }));
    }

    #[test]
    fn test_staged_write_not_visible_until_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, b"previous").unwrap();

        let staged = stage_write(&path, b"next").unwrap();
        assert_eq!(staged.target(), path.as_path());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");

        staged.commit().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"next");
    }

    #[test]
    fn test_staged_write_dropped_leaves_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("texts.json");
        std::fs::write(&path, b"previous").unwrap();

        drop(stage_write(&path, b"abandoned").unwrap());

        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_paths() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present");
        let absent = dir.path().join("absent");
        std::fs::write(&present, b"").unwrap();

        let missing = missing_paths(&[&present, &absent]);
        assert_eq!(missing, vec![absent]);
    }

    #[test]
    fn test_missing_paths_all_present() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"").unwrap();

        assert!(missing_paths(&[a]).is_empty());
    }
}
