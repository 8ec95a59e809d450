use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// A named documentable unit with its own entity namespace.
///
/// Metadata comes from the project's `Cargo.toml` `[package]` table, with
/// the name overridable from configuration. Long-lived for the duration of
/// one build; never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    /// Version string, for display alongside the docs.
    pub tag: Option<String>,
    /// Browsable repository URL, for edit links.
    pub href: Option<String>,
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: Option<ManifestPackage>,
}

#[derive(Debug, Deserialize)]
struct ManifestPackage {
    name: Option<String>,
    version: Option<String>,
    repository: Option<String>,
}

impl Project {
    /// Discover a project at `root`.
    ///
    /// Name resolution order: explicit override, manifest package name,
    /// directory name. A missing or partial manifest is not an error; a
    /// bare directory of sources is still documentable.
    pub fn discover(root: &Path, name_override: Option<&str>) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound {
                kind: "project root",
                name: root.display().to_string(),
            });
        }

        let manifest = read_manifest(&root.join("Cargo.toml"))?;
        let package = manifest.and_then(|m| m.package);

        let name = name_override
            .map(str::to_string)
            .or_else(|| package.as_ref().and_then(|p| p.name.clone()))
            .or_else(|| {
                root.file_name().map(|n| n.to_string_lossy().to_string())
            })
            .ok_or_else(|| {
                Error::Config(format!(
                    "cannot determine a project name for {}",
                    root.display()
                ))
            })?;

        Ok(Self {
            name,
            tag: package.as_ref().and_then(|p| p.version.clone()),
            href: package.as_ref().and_then(|p| p.repository.clone()),
            root: root.to_path_buf(),
        })
    }
}

fn read_manifest(path: &Path) -> Result<Option<Manifest>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    match toml::from_str(&contents) {
        Ok(manifest) => Ok(Some(manifest)),
        Err(e) => Err(Error::Config(format!(
            "invalid manifest {}: {e}",
            path.display()
        ))),
    }
}
