use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default location of the docs-app pages, relative to the project root.
pub const DEFAULT_DOCS_APP_PATH: &str = "tests/dummy/app";

/// Default subdirectory holding the documentable source tree.
pub const DEFAULT_SOURCE_DIR: &str = "addon";

/// Default output directory, relative to the project root.
pub const DEFAULT_OUT_DIR: &str = "dist/docs";

const DEFAULT_SNIPPET_BEGIN: &str =
    r#"\{\{#(?:docs-snippet|demo\.example|demo\.live-example)\s+name=["']([^"'\s]+)["']"#;
const DEFAULT_SNIPPET_END: &str =
    r"\{\{/(?:docs-snippet|demo\.example|demo\.live-example)\}\}";

/// Begin/end patterns delimiting named snippet regions.
///
/// The begin pattern's first capture group is the snippet name.
#[derive(Debug, Clone)]
pub struct SnippetPatterns {
    pub begin: Regex,
    pub end: Regex,
}

impl Default for SnippetPatterns {
    fn default() -> Self {
        Self {
            begin: Regex::new(DEFAULT_SNIPPET_BEGIN).unwrap(),
            end: Regex::new(DEFAULT_SNIPPET_END).unwrap(),
        }
    }
}

impl SnippetPatterns {
    fn from_strings(begin: &str, end: &str) -> Result<Self> {
        let begin = Regex::new(begin).map_err(|e| {
            Error::Config(format!("invalid snippet begin pattern: {e}"))
        })?;
        let end = Regex::new(end).map_err(|e| {
            Error::Config(format!("invalid snippet end pattern: {e}"))
        })?;
        Ok(Self { begin, end })
    }
}

/// The immutable configuration for one build invocation.
///
/// Built once by [`BuildConfig::resolve`] from layered sources (built-in
/// defaults, then `docsmith.toml`, then CLI overrides; later layer wins)
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root directory of the main project.
    pub root: PathBuf,
    /// Directory the output tree is written to.
    pub out_dir: PathBuf,
    /// Explicit cache directory override, if any.
    pub cache_dir: Option<PathBuf>,
    /// Overrides the main project's name (default: manifest package name).
    pub project_name: Option<String>,
    /// URL prefix under which the output tree is served.
    pub assets_url_path: String,
    /// Docs-app pages directory, relative to each project root.
    pub docs_app_path: String,
    /// Documentable source subdirectory, relative to each project root.
    pub source_dir: String,
    /// Roots of additional projects to document, relative to `root`.
    pub documented_addons: Vec<PathBuf>,
    /// Names of registered generator plugins to run, in declaration order.
    pub plugins: Vec<String>,
    /// Glob patterns selecting files scanned for snippet regions.
    pub snippet_search_paths: Vec<String>,
    pub snippet_patterns: SnippetPatterns,
    /// Suffix snippet names with the source file's extension.
    pub include_file_extension_in_snippet_names: bool,
    /// Bypass the fingerprint cache and recompile everything.
    pub force: bool,
}

/// The subset of options accepted from `docsmith.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub project_name: Option<String>,
    pub assets_url_path: Option<String>,
    pub docs_app_path: Option<String>,
    pub source_dir: Option<String>,
    pub documented_addons: Option<Vec<PathBuf>>,
    pub plugins: Option<Vec<String>>,
    pub snippet_search_paths: Option<Vec<String>>,
    pub snippet_regexes: Option<SnippetRegexes>,
    pub include_file_extension_in_snippet_names: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnippetRegexes {
    pub begin: String,
    pub end: String,
}

/// Options taken from the command line, overriding the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub out_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub force: bool,
}

impl BuildConfig {
    /// Resolve the effective configuration for a build rooted at `root`.
    ///
    /// Reads `docsmith.toml` from the root when present. The merge is a pure
    /// reduction over the three layers; no layer mutates another.
    pub fn resolve(root: &Path, cli: CliOverrides) -> Result<Self> {
        let file = load_file_config(&root.join("docsmith.toml"))?;
        Self::merge(root, file, cli)
    }

    /// Deterministically merge defaults, file config, and CLI overrides.
    pub fn merge(
        root: &Path,
        file: FileConfig,
        cli: CliOverrides,
    ) -> Result<Self> {
        let docs_app_path = file
            .docs_app_path
            .unwrap_or_else(|| DEFAULT_DOCS_APP_PATH.to_string());

        let snippet_patterns = match &file.snippet_regexes {
            Some(r) => SnippetPatterns::from_strings(&r.begin, &r.end)?,
            None => SnippetPatterns::default(),
        };

        let snippet_search_paths = file
            .snippet_search_paths
            .unwrap_or_else(|| vec![format!("{docs_app_path}/**")]);

        Ok(Self {
            root: root.to_path_buf(),
            out_dir: cli
                .out_dir
                .unwrap_or_else(|| root.join(DEFAULT_OUT_DIR)),
            cache_dir: cli.cache_dir,
            project_name: file.project_name,
            assets_url_path: file
                .assets_url_path
                .unwrap_or_else(|| "/".to_string()),
            docs_app_path,
            source_dir: file
                .source_dir
                .unwrap_or_else(|| DEFAULT_SOURCE_DIR.to_string()),
            documented_addons: file.documented_addons.unwrap_or_default(),
            plugins: file.plugins.unwrap_or_default(),
            snippet_search_paths,
            snippet_patterns,
            include_file_extension_in_snippet_names: file
                .include_file_extension_in_snippet_names
                .unwrap_or(false),
            force: cli.force,
        })
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| {
        Error::Config(format!("invalid {}: {e}", path.display()))
    })
}
