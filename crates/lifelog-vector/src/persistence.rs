//! Snapshot persistence for the retrieval index.
//!
//! A snapshot is three position-aligned files:
//!
//! | File | Format |
//! |------|--------|
//! | index | binary header + row-major little-endian `f32` vectors |
//! | metadata | JSON array of `{"collection_name": ...}` |
//! | texts | JSON array of strings |
//!
//! # Index file layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `LLVI` |
//! | 4 | 4 | format version (u32 LE) |
//! | 8 | 4 | dimension (u32 LE, 0 for an empty index) |
//! | 12 | 8 | vector count (u64 LE) |
//! | 20 | 32 | blake3 digest of the metadata and text files |
//! | 52 | count × dimension × 4 | vectors (f32 LE) |
//!
//! All three files are staged before any of them is renamed into place, and
//! the index file is renamed last. The digest ties the index to the exact
//! companion files it was built with, so a snapshot torn by a crash between
//! renames is detected on load. If a rename fails, the companion files
//! already renamed are restored from their previous contents.

use std::collections::BTreeMap;
use std::path::Path;

use lifelog_core::{Error, Result, missing_paths, stage_write, write_atomic};

use crate::index::FlatL2Index;
use crate::metadata::MetadataStore;
use crate::types::{DriftPolicy, RetrieverConfig, SnapshotStats};

/// Magic bytes at the start of every index file.
pub const INDEX_MAGIC: &[u8; 4] = b"LLVI";

/// Current index file format version.
pub const FORMAT_VERSION: u32 = 1;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + DIGEST_LEN;

// ============================================================================
// Snapshot
// ============================================================================

/// One built index: vectors, metadata, and texts, aligned by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// The vector index.
    pub index: FlatL2Index,
    /// Metadata entry per vector.
    pub metadata: MetadataStore,
    /// Raw text per vector.
    pub texts: Vec<String>,
}

impl Snapshot {
    /// Assemble a snapshot from its three parts.
    pub fn new(index: FlatL2Index, metadata: MetadataStore, texts: Vec<String>) -> Self {
        Self {
            index,
            metadata,
            texts,
        }
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Describe the length mismatch between the three parts, if any.
    pub fn drift(&self) -> Option<String> {
        let vectors = self.index.len();
        let metadata = self.metadata.len();
        let texts = self.texts.len();
        (vectors != metadata || vectors != texts)
            .then(|| format!("{vectors} vectors, {metadata} metadata entries, {texts} texts"))
    }

    /// Enforce the length invariant under `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inconsistent`] under [`DriftPolicy::Strict`] when
    /// the parts disagree. [`DriftPolicy::Lenient`] only logs a warning.
    pub fn check_alignment(&self, policy: DriftPolicy) -> Result<()> {
        let Some(description) = self.drift() else {
            return Ok(());
        };
        match policy {
            DriftPolicy::Strict => Err(Error::inconsistent(description)),
            DriftPolicy::Lenient => {
                log::warn!("Snapshot parts disagree ({description}); out-of-range hits will be skipped");
                Ok(())
            }
        }
    }

    /// Shape of this snapshot.
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            document_count: self.len(),
            dimension: self.index.dimension().unwrap_or(0),
            collections: self.collection_counts(),
        }
    }

    fn collection_counts(&self) -> BTreeMap<String, usize> {
        self.metadata.collection_counts()
    }
}

// ============================================================================
// Save / Load
// ============================================================================

/// True when all three snapshot files exist.
pub fn snapshot_exists(config: &RetrieverConfig) -> bool {
    missing_paths(&config.snapshot_paths()).is_empty()
}

/// Write `snapshot` to the paths in `config`, replacing any previous one.
///
/// Nothing on disk changes unless all three files were staged
/// successfully. When a later rename fails, the metadata and text files
/// already renamed are rolled back to their previous contents. A crash
/// between renames, or a failed rollback, leaves a torn snapshot that
/// [`load_snapshot`] rejects; the previous snapshot is then lost and the
/// index must be rebuilt.
pub fn save_snapshot(config: &RetrieverConfig, snapshot: &Snapshot) -> Result<()> {
    for path in config.snapshot_paths() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
        }
    }

    let metadata_bytes = serde_json::to_vec(&snapshot.metadata)?;
    let texts_bytes = serde_json::to_vec(&snapshot.texts)?;
    let digest = companion_digest(&metadata_bytes, &texts_bytes);
    let index_bytes = encode_index(&snapshot.index, &digest)?;

    let previous = [
        (config.metadata_path.as_path(), read_existing(&config.metadata_path)?),
        (config.texts_path.as_path(), read_existing(&config.texts_path)?),
    ];
    let staged = [
        stage_write(&config.metadata_path, &metadata_bytes)?,
        stage_write(&config.texts_path, &texts_bytes)?,
        stage_write(&config.index_path, &index_bytes)?,
    ];
    for (committed, write) in staged.into_iter().enumerate() {
        if let Err(e) = write.commit() {
            roll_back(&previous[..committed.min(previous.len())]);
            return Err(e);
        }
    }

    log::debug!(
        "Saved snapshot of {} documents to {}",
        snapshot.len(),
        config.index_path.display()
    );
    Ok(())
}

/// Read the snapshot at the paths in `config`.
///
/// # Errors
///
/// - [`Error::MissingIndex`] if any of the three files is absent
/// - [`Error::InvalidData`] if the index file is corrupt or truncated
/// - [`Error::Inconsistent`] under [`DriftPolicy::Strict`] if the files
///   come from different builds or disagree in length
pub fn load_snapshot(config: &RetrieverConfig) -> Result<Snapshot> {
    let missing = missing_paths(&config.snapshot_paths());
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        return Err(Error::missing_index(format!(
            "snapshot file(s) not found: {}; run build first",
            names.join(", ")
        )));
    }

    let index_bytes = read(&config.index_path)?;
    let metadata_bytes = read(&config.metadata_path)?;
    let texts_bytes = read(&config.texts_path)?;

    let (index, stored_digest) = decode_index(&index_bytes)?;
    if stored_digest != companion_digest(&metadata_bytes, &texts_bytes) {
        let message = "index file does not match the metadata and text files it was built with";
        match config.drift_policy {
            DriftPolicy::Strict => return Err(Error::inconsistent(message)),
            DriftPolicy::Lenient => log::warn!("{message}"),
        }
    }

    let metadata: MetadataStore = serde_json::from_slice(&metadata_bytes)
        .map_err(|e| Error::parse(format!("{}: {e}", config.metadata_path.display())))?;
    let texts: Vec<String> = serde_json::from_slice(&texts_bytes)
        .map_err(|e| Error::parse(format!("{}: {e}", config.texts_path.display())))?;

    let snapshot = Snapshot::new(index, metadata, texts);
    snapshot.check_alignment(config.drift_policy)?;

    log::debug!(
        "Loaded snapshot of {} documents from {}",
        snapshot.len(),
        config.index_path.display()
    );
    Ok(snapshot)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io_with_path(e, path))
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io_with_path(e, path)),
    }
}

/// Put companion files back the way they were before a failed save.
fn roll_back(previous: &[(&Path, Option<Vec<u8>>)]) {
    for (path, contents) in previous {
        let restored = match contents {
            Some(bytes) => write_atomic(path, bytes),
            None => std::fs::remove_file(path).map_err(|e| Error::io_with_path(e, path)),
        };
        if let Err(e) = restored {
            log::warn!("Could not restore {} after a failed save: {e}", path.display());
        }
    }
}

// ============================================================================
// Index codec
// ============================================================================

/// Digest binding an index file to its metadata and text files.
fn companion_digest(metadata: &[u8], texts: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(metadata.len() as u64).to_le_bytes());
    hasher.update(metadata);
    hasher.update(texts);
    *hasher.finalize().as_bytes()
}

/// Serialize an index with its companion digest.
pub fn encode_index(index: &FlatL2Index, digest: &[u8; DIGEST_LEN]) -> Result<Vec<u8>> {
    let dimension = u32::try_from(index.dimension().unwrap_or(0))
        .map_err(|_| Error::invalid_data("index dimension does not fit in 32 bits"))?;
    let count = index.len() as u64;
    let data = index.as_flat();

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&dimension.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(digest);
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// Parse an index file, returning the index and its companion digest.
pub fn decode_index(bytes: &[u8]) -> Result<(FlatL2Index, [u8; DIGEST_LEN])> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::invalid_data(format!(
            "index file is {} bytes, shorter than its {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);

    if &header[0..4] != INDEX_MAGIC {
        return Err(Error::invalid_data("not a lifelog index file (bad magic)"));
    }
    let version = read_u32(&header[4..8]);
    if version != FORMAT_VERSION {
        return Err(Error::invalid_data(format!(
            "unsupported index format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let dimension = read_u32(&header[8..12]) as usize;
    let count = usize::try_from(read_u64(&header[12..20]))
        .map_err(|_| Error::invalid_data("index vector count does not fit in memory"))?;
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&header[20..HEADER_LEN]);

    if dimension == 0 && count != 0 {
        return Err(Error::invalid_data("index has vectors but a dimension of zero"));
    }
    let expected_bytes = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::invalid_data("index size overflows"))?;
    if body.len() != expected_bytes {
        return Err(Error::invalid_data(format!(
            "index file holds {} bytes of vectors, header promises {expected_bytes}",
            body.len()
        )));
    }

    let data: Vec<f32> = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let index = FlatL2Index::from_flat(dimension, data)?;
    Ok((index, digest))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataEntry;
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut index = FlatL2Index::new();
        index
            .add(&[vec![0.1, 0.2, 0.3], vec![-1.5, 2.25, f32::MIN_POSITIVE]])
            .unwrap();
        let metadata = MetadataStore::from_entries(vec![
            MetadataEntry::new("wearable"),
            MetadataEntry::new("chat_history"),
        ]);
        let texts = vec!["slept 6 hours".to_string(), "asked about sleep".to_string()];
        Snapshot::new(index, metadata, texts)
    }

    #[test]
    fn test_snapshot_drift_none_when_aligned() {
        let snapshot = sample_snapshot();
        assert!(snapshot.drift().is_none());
        assert!(snapshot.check_alignment(DriftPolicy::Strict).is_ok());
    }

    #[test]
    fn test_snapshot_drift_strict_and_lenient() {
        let mut snapshot = sample_snapshot();
        snapshot.texts.pop();

        let description = snapshot.drift().unwrap();
        assert!(description.contains("2 vectors"));
        assert!(description.contains("1 texts"));

        let err = snapshot.check_alignment(DriftPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::Inconsistent(_)));
        assert!(snapshot.check_alignment(DriftPolicy::Lenient).is_ok());
    }

    #[test]
    fn test_snapshot_stats() {
        let stats = sample_snapshot().stats();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.dimension, 3);
        assert_eq!(stats.collections.get("wearable"), Some(&1));
    }

    #[test]
    fn test_encode_decode_preserves_bits() {
        let snapshot = sample_snapshot();
        let digest = [7u8; DIGEST_LEN];

        let bytes = encode_index(&snapshot.index, &digest).unwrap();
        assert_eq!(&bytes[0..4], b"LLVI");
        assert_eq!(bytes.len(), HEADER_LEN + 6 * 4);

        let (index, stored) = decode_index(&bytes).unwrap();
        assert_eq!(stored, digest);
        assert_eq!(index, snapshot.index);
    }

    #[test]
    fn test_decode_empty_index() {
        let bytes = encode_index(&FlatL2Index::new(), &[0u8; DIGEST_LEN]).unwrap();
        let (index, _) = decode_index(&bytes).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = encode_index(&sample_snapshot().index, &[0u8; DIGEST_LEN]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_index(&bytes), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let mut bytes = encode_index(&sample_snapshot().index, &[0u8; DIGEST_LEN]).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_index(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let bytes = encode_index(&sample_snapshot().index, &[0u8; DIGEST_LEN]).unwrap();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(decode_index(truncated), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert!(matches!(decode_index(b"LLVI"), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        let snapshot = sample_snapshot();

        save_snapshot(&config, &snapshot).unwrap();
        assert!(snapshot_exists(&config));

        let loaded = load_snapshot(&config).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_failed_index_rename_restores_previous_snapshot() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        let previous = sample_snapshot();
        save_snapshot(&config, &previous).unwrap();
        let previous_index = std::fs::read(&config.index_path).unwrap();

        // A non-empty directory at the index path makes the final rename fail.
        std::fs::remove_file(&config.index_path).unwrap();
        std::fs::create_dir(&config.index_path).unwrap();
        std::fs::write(config.index_path.join("blocker"), b"x").unwrap();

        let mut next = sample_snapshot();
        next.metadata = MetadataStore::from_entries(vec![
            MetadataEntry::new("location_data"),
            MetadataEntry::new("location_data"),
        ]);
        next.texts = vec!["visited the park".to_string(), "visited the cafe".to_string()];
        assert!(save_snapshot(&config, &next).is_err());

        std::fs::remove_dir_all(&config.index_path).unwrap();
        std::fs::write(&config.index_path, previous_index).unwrap();
        assert_eq!(load_snapshot(&config).unwrap(), previous);
    }

    #[test]
    fn test_failed_first_save_leaves_no_companions() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        std::fs::create_dir(&config.index_path).unwrap();
        std::fs::write(config.index_path.join("blocker"), b"x").unwrap();

        assert!(save_snapshot(&config, &sample_snapshot()).is_err());
        assert!(!config.metadata_path.exists());
        assert!(!config.texts_path.exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path().join("nested").join("index"));

        save_snapshot(&config, &sample_snapshot()).unwrap();
        assert!(snapshot_exists(&config));
    }

    #[test]
    fn test_metadata_and_texts_files_are_json_arrays() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        save_snapshot(&config, &sample_snapshot()).unwrap();

        let metadata = std::fs::read_to_string(&config.metadata_path).unwrap();
        assert_eq!(
            metadata,
            r#"[{"collection_name":"wearable"},{"collection_name":"chat_history"}]"#
        );
        let texts = std::fs::read_to_string(&config.texts_path).unwrap();
        assert_eq!(texts, r#"["slept 6 hours","asked about sleep"]"#);
    }

    #[test]
    fn test_load_missing_file_is_missing_index() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        save_snapshot(&config, &sample_snapshot()).unwrap();
        std::fs::remove_file(&config.texts_path).unwrap();

        let err = load_snapshot(&config).unwrap_err();
        assert!(err.is_missing_index());
        assert!(err.to_string().contains("texts.json"));
    }

    #[test]
    fn test_load_detects_companion_swap() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path());
        save_snapshot(&config, &sample_snapshot()).unwrap();

        // Same length, different content: only the digest can catch this.
        std::fs::write(&config.texts_path, r#"["other","texts"]"#).unwrap();

        let err = load_snapshot(&config).unwrap_err();
        assert!(matches!(err, Error::Inconsistent(_)));
    }

    #[test]
    fn test_load_lenient_accepts_drift() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path()).with_drift_policy(DriftPolicy::Lenient);
        save_snapshot(&config, &sample_snapshot()).unwrap();
        std::fs::write(&config.texts_path, r#"["only one"]"#).unwrap();

        let loaded = load_snapshot(&config).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.texts.len(), 1);
    }

    #[test]
    fn test_load_malformed_metadata() {
        let dir = tempdir().unwrap();
        let config = RetrieverConfig::in_dir(dir.path()).with_drift_policy(DriftPolicy::Lenient);
        save_snapshot(&config, &sample_snapshot()).unwrap();
        std::fs::write(&config.metadata_path, "not json").unwrap();

        assert!(matches!(load_snapshot(&config), Err(Error::Parse(_))));
    }
}
