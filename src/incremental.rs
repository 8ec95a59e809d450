use std::{
    collections::HashMap,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::Path,
};

use tracing::debug;

use crate::{
    cache_db::CacheDb,
    error::Result,
    walker::{SourceFile, TreeSnapshot},
};

/// Stable cache key for a file, derived from (project, relative_path).
fn file_key(project: &str, relative_path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    project.hash(&mut hasher);
    relative_path.hash(&mut hasher);
    hasher.finish()
}

/// Metadata stored per source file in cache.redb.
///
/// Serialized as: `"project\0relative_path\0mtime"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub project: String,
    pub relative_path: String,
    pub mtime: u64,
}

impl FileMetadata {
    /// Serialize to a byte vector for storage in the cache database.
    pub fn serialize(&self) -> Vec<u8> {
        format!("{}\0{}\0{}", self.project, self.relative_path, self.mtime)
            .into_bytes()
    }

    /// Deserialize from bytes. Returns `None` if the format is invalid.
    pub fn deserialize(bytes: &[u8]) -> Option<Self> {
        let s = std::str::from_utf8(bytes).ok()?;
        let mut parts = s.splitn(3, '\0');
        let project = parts.next()?.to_string();
        let relative_path = parts.next()?.to_string();
        let mtime = parts.next()?.parse().ok()?;
        Some(Self {
            project,
            relative_path,
            mtime,
        })
    }
}

/// Result of comparing a tree snapshot against stored file metadata.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Files that are new (not in the cache).
    pub new_files: Vec<SourceFile>,
    /// Files that have changed (mtime differs).
    pub changed_files: Vec<SourceFile>,
    /// Cache keys that were stored but are no longer in the snapshot.
    pub deleted_keys: Vec<u64>,
}

impl DiffResult {
    pub fn is_unchanged(&self) -> bool {
        self.new_files.is_empty()
            && self.changed_files.is_empty()
            && self.deleted_keys.is_empty()
    }
}

/// Compare a snapshot against the cached metadata for `project`.
pub fn diff_snapshot(
    cache_db: &CacheDb,
    project: &str,
    snapshot: &TreeSnapshot,
) -> Result<DiffResult> {
    // Build a map of all known files for this project.
    let mut known: HashMap<String, (u64, u64)> = HashMap::new(); // path -> (key, mtime)

    for (key, bytes) in cache_db.list_all_file_metadata()? {
        if let Some(meta) = FileMetadata::deserialize(&bytes)
            && meta.project == project
        {
            known.insert(meta.relative_path.clone(), (key, meta.mtime));
        }
    }

    let mut result = DiffResult::default();

    // Track which known files we've seen in the snapshot.
    let mut seen_paths = std::collections::HashSet::new();

    for file in &snapshot.files {
        let rel_path = file.relative_path.to_string_lossy().to_string();
        seen_paths.insert(rel_path.clone());

        match known.get(&rel_path) {
            None => {
                result.new_files.push(file.clone());
            }
            Some((_key, stored_mtime)) => {
                if file.mtime != *stored_mtime {
                    result.changed_files.push(file.clone());
                }
                // If mtime matches, it's unchanged — skip.
            }
        }
    }

    // Find deleted files (in the cache but not in the snapshot).
    for (path, (key, _)) in &known {
        if !seen_paths.contains(path) {
            result.deleted_keys.push(*key);
        }
    }

    Ok(result)
}

/// Record a successfully compiled snapshot: per-file metadata in one
/// transaction, dropped entries removed, then the project fingerprint.
pub fn record_snapshot(
    cache_db: &CacheDb,
    project: &str,
    snapshot: &TreeSnapshot,
) -> Result<()> {
    let diff = diff_snapshot(cache_db, project, snapshot)?;
    cache_db.remove_file_metadata(&diff.deleted_keys)?;

    let entries: Vec<(u64, Vec<u8>)> = snapshot
        .files
        .iter()
        .map(|file| {
            let rel_path = file.relative_path.to_string_lossy().to_string();
            let meta = FileMetadata {
                project: project.to_string(),
                relative_path: rel_path.clone(),
                mtime: file.mtime,
            };
            (file_key(project, &rel_path), meta.serialize())
        })
        .collect();
    cache_db.batch_set_file_metadata(&entries)?;

    cache_db.set_fingerprint(project, snapshot.fingerprint)
}

/// Whether the compile pass for `project` can be skipped entirely.
///
/// True only when the stored fingerprint matches the snapshot and the
/// previously published project record is still present on disk; anything
/// else forces a full recompile of the project.
pub fn can_skip_compile(
    cache_db: &CacheDb,
    project: &str,
    snapshot: &TreeSnapshot,
    out_dir: &Path,
) -> Result<bool> {
    let stored = cache_db.get_fingerprint(project)?;
    let record_exists = out_dir.join(format!("{project}.json")).is_file();

    let skip = stored == Some(snapshot.fingerprint) && record_exists;
    if !skip {
        debug!(
            project,
            ?stored,
            fingerprint = snapshot.fingerprint,
            record_exists,
            "compile pass required"
        );
    }
    Ok(skip)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn test_db() -> (tempfile::TempDir, CacheDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = CacheDb::open(&tmp.path().join("cache.redb")).unwrap();
        (tmp, db)
    }

    fn make_file(name: &str, mtime: u64) -> SourceFile {
        SourceFile {
            relative_path: PathBuf::from(name),
            absolute_path: PathBuf::from(format!("/abs/{name}")),
            mtime,
            size: 1,
        }
    }

    fn make_snapshot(files: Vec<SourceFile>, fingerprint: u64) -> TreeSnapshot {
        TreeSnapshot {
            root: PathBuf::from("/abs"),
            files,
            fingerprint,
        }
    }

    #[test]
    fn metadata_roundtrip() {
        let meta = FileMetadata {
            project: "main".to_string(),
            relative_path: "addon/lib.rs".to_string(),
            mtime: 12345,
        };
        let bytes = meta.serialize();
        let restored = FileMetadata::deserialize(&bytes).unwrap();
        assert_eq!(meta, restored);
    }

    #[test]
    fn all_new_files() {
        let (_tmp, db) = test_db();
        let snap =
            make_snapshot(vec![make_file("a.md", 100), make_file("b.md", 200)], 1);
        let diff = diff_snapshot(&db, "main", &snap).unwrap();

        assert_eq!(diff.new_files.len(), 2);
        assert!(diff.changed_files.is_empty());
        assert!(diff.deleted_keys.is_empty());
    }

    #[test]
    fn unchanged_files() {
        let (_tmp, db) = test_db();
        let snap = make_snapshot(vec![make_file("a.md", 100)], 1);
        record_snapshot(&db, "main", &snap).unwrap();

        let diff = diff_snapshot(&db, "main", &snap).unwrap();
        assert!(diff.is_unchanged());
    }

    #[test]
    fn changed_file_detected() {
        let (_tmp, db) = test_db();
        let snap = make_snapshot(vec![make_file("a.md", 100)], 1);
        record_snapshot(&db, "main", &snap).unwrap();

        // Same file, different mtime
        let updated = make_snapshot(vec![make_file("a.md", 200)], 2);
        let diff = diff_snapshot(&db, "main", &updated).unwrap();
        assert!(diff.new_files.is_empty());
        assert_eq!(diff.changed_files.len(), 1);
        assert!(diff.deleted_keys.is_empty());
    }

    #[test]
    fn deleted_file_detected() {
        let (_tmp, db) = test_db();
        let snap = make_snapshot(vec![make_file("a.md", 100)], 1);
        record_snapshot(&db, "main", &snap).unwrap();

        // Empty snapshot = file was deleted
        let empty = make_snapshot(vec![], 2);
        let diff = diff_snapshot(&db, "main", &empty).unwrap();
        assert!(diff.new_files.is_empty());
        assert!(diff.changed_files.is_empty());
        assert_eq!(diff.deleted_keys.len(), 1);
    }

    #[test]
    fn ignores_other_projects() {
        let (_tmp, db) = test_db();
        let snap = make_snapshot(vec![make_file("a.md", 100)], 1);
        record_snapshot(&db, "other", &snap).unwrap();

        // Diffing "main" should not see "other"'s files
        let empty = make_snapshot(vec![], 2);
        let diff = diff_snapshot(&db, "main", &empty).unwrap();
        assert!(diff.deleted_keys.is_empty());
    }

    #[test]
    fn skip_requires_matching_fingerprint_and_record() {
        let (_tmp, db) = test_db();
        let out = tempfile::tempdir().unwrap();
        let snap = make_snapshot(vec![make_file("a.md", 100)], 9);

        // Nothing recorded yet.
        assert!(!can_skip_compile(&db, "main", &snap, out.path()).unwrap());

        record_snapshot(&db, "main", &snap).unwrap();
        // Fingerprint matches but the published record is missing.
        assert!(!can_skip_compile(&db, "main", &snap, out.path()).unwrap());

        std::fs::write(out.path().join("main.json"), "{}").unwrap();
        assert!(can_skip_compile(&db, "main", &snap, out.path()).unwrap());

        // A different snapshot forces a rebuild.
        let changed = make_snapshot(vec![make_file("a.md", 101)], 10);
        assert!(!can_skip_compile(&db, "main", &changed, out.path()).unwrap());
    }
}
