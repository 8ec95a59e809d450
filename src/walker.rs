use std::{
    collections::BTreeMap,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::error::Result;

/// A discovered source file inside a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
    /// Last modification time as seconds since the Unix epoch.
    pub mtime: u64,
    /// File size in bytes.
    pub size: u64,
}

/// An immutable view of a project's documentable files at one point in time.
///
/// All pipeline stages consume snapshots rather than the live filesystem, so
/// one build pass sees a single consistent file set. The `fingerprint` is a
/// stable hash over (path, mtime, size) of every file, used by the
/// incremental layer to detect unchanged inputs.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub fingerprint: u64,
}

impl TreeSnapshot {
    /// Snapshot the given subdirectories and top-level files of `root`.
    ///
    /// Paths in `dirs` and `files` are relative to `root`; entries that do
    /// not exist are silently skipped (a project without a docs app is still
    /// documentable). Hidden files and directories are excluded. The file
    /// list is sorted by relative path.
    pub fn build(root: &Path, dirs: &[PathBuf], files: &[PathBuf]) -> Result<Self> {
        let canonical_root = root.canonicalize()?;
        let mut collected: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();

        for dir in dirs {
            let abs = canonical_root.join(dir);
            if abs.is_dir() {
                walk_dir(&canonical_root, &abs, &mut collected)?;
            }
        }

        for file in files {
            let abs = canonical_root.join(file);
            if abs.is_file()
                && let Some(sf) = make_source_file(&canonical_root, &abs, &abs)?
            {
                collected.insert(sf.relative_path.clone(), sf);
            }
        }

        let files: Vec<SourceFile> = collected.into_values().collect();
        let fingerprint = fingerprint_files(&files);

        Ok(Self {
            root: canonical_root,
            files,
            fingerprint,
        })
    }

    /// Files whose relative path starts with `prefix`, in sorted order.
    pub fn files_under<'a>(
        &'a self,
        prefix: &'a Path,
    ) -> impl Iterator<Item = &'a SourceFile> {
        self.files
            .iter()
            .filter(move |f| f.relative_path.starts_with(prefix))
    }
}

fn fingerprint_files(files: &[SourceFile]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for file in files {
        file.relative_path.hash(&mut hasher);
        file.mtime.hash(&mut hasher);
        file.size.hash(&mut hasher);
    }
    hasher.finish()
}

fn walk_dir(
    root: &Path,
    current: &Path,
    collected: &mut BTreeMap<PathBuf, SourceFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files and directories.
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &entry.path(), collected)?;
        } else if file_type.is_symlink() {
            // Resolve symlink and check for cycles.
            let resolved = match entry.path().canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // Skip broken symlinks
            };
            // Skip if the symlink points back into or above the root
            // (cycle prevention).
            if resolved.starts_with(root) && resolved.is_dir() {
                continue;
            }
            if resolved.is_file()
                && let Some(sf) = make_source_file(root, &entry.path(), &resolved)?
            {
                collected.insert(sf.relative_path.clone(), sf);
            }
        } else if file_type.is_file() {
            let abs = entry.path().canonicalize()?;
            if let Some(sf) = make_source_file(root, &entry.path(), &abs)? {
                collected.insert(sf.relative_path.clone(), sf);
            }
        }
    }

    Ok(())
}

fn make_source_file(
    root: &Path,
    original_path: &Path,
    absolute_path: &Path,
) -> Result<Option<SourceFile>> {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    let metadata = std::fs::metadata(absolute_path)?;
    let mtime = metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    Ok(Some(SourceFile {
        relative_path,
        absolute_path: absolute_path.to_path_buf(),
        mtime,
        size: metadata.len(),
    }))
}
