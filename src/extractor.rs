use std::{collections::BTreeMap, path::Path};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::{
    config::{BuildConfig, SnippetPatterns},
    error::{Error, Result},
    walker::TreeSnapshot,
};

/// File extensions scanned for snippet regions and prose content.
const TEMPLATE_EXTENSIONS: &[&str] = &["md", "hbs", "html", "txt"];

/// Raw documentation content pulled out of the docs-app pages.
///
/// A read-only side channel: extraction never alters the scanned files, it
/// only captures text for the search indexer and for live demo embedding.
#[derive(Debug, Default, Clone)]
pub struct ExtractedContent {
    /// Snippet name -> verbatim region text (marker lines excluded).
    pub snippets: BTreeMap<String, String>,
    /// Relative page path -> raw page text, for full-text prose search.
    pub pages: BTreeMap<String, String>,
}

/// Scans template/markdown pages for named snippet regions.
pub struct ContentExtractor {
    patterns: SnippetPatterns,
    search_paths: GlobSet,
    include_extension: bool,
}

impl ContentExtractor {
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.snippet_search_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::Config(format!(
                    "invalid snippet search path '{pattern}': {e}"
                ))
            })?;
            builder.add(glob);
        }
        let search_paths = builder.build().map_err(|e| {
            Error::Config(format!("invalid snippet search paths: {e}"))
        })?;

        Ok(Self {
            patterns: config.snippet_patterns.clone(),
            search_paths,
            include_extension: config.include_file_extension_in_snippet_names,
        })
    }

    /// Extract snippets and raw page text from every matching file in the
    /// snapshot. Files are visited in sorted path order, so duplicate
    /// snippet names resolve deterministically (last write wins).
    pub fn extract(&self, snapshot: &TreeSnapshot) -> Result<ExtractedContent> {
        let mut content = ExtractedContent::default();

        for file in &snapshot.files {
            if !self.is_scannable(&file.relative_path) {
                continue;
            }

            let text = std::fs::read_to_string(&file.absolute_path)?;
            let rel = file.relative_path.to_string_lossy().to_string();
            self.scan_file(&file.relative_path, &text, &mut content);
            content.pages.insert(rel, text);
        }

        Ok(content)
    }

    fn is_scannable(&self, relative_path: &Path) -> bool {
        relative_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
            && self.search_paths.is_match(relative_path)
    }

    /// Line-oriented region capture. A begin-pattern match opens a capture,
    /// an end-pattern match closes it; the marker lines themselves are
    /// excluded. A second begin while a capture is open replaces it
    /// (last-open-wins); an unterminated capture at end of file is kept.
    /// Both conditions are surfaced as build warnings.
    fn scan_file(
        &self,
        path: &Path,
        text: &str,
        content: &mut ExtractedContent,
    ) {
        let mut open: Option<(String, Vec<&str>)> = None;

        for line in text.lines() {
            if let Some(captures) = self.patterns.begin.captures(line) {
                if let Some((name, _)) = open.take() {
                    warn!(
                        file = %path.display(),
                        snippet = %name,
                        "snippet region reopened before closing; \
                         keeping the most recent region"
                    );
                }
                let name = captures
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                open = Some((self.snippet_key(&name, path), Vec::new()));
            } else if self.patterns.end.is_match(line) {
                if let Some((name, lines)) = open.take() {
                    content.snippets.insert(name, lines.join("\n"));
                }
            } else if let Some((_, lines)) = open.as_mut() {
                lines.push(line);
            }
        }

        if let Some((name, lines)) = open {
            warn!(
                file = %path.display(),
                snippet = %name,
                "unterminated snippet region at end of file"
            );
            content.snippets.insert(name, lines.join("\n"));
        }
    }

    fn snippet_key(&self, name: &str, path: &Path) -> String {
        if self.include_extension
            && let Some(ext) = path.extension().and_then(|e| e.to_str())
        {
            format!("{name}.{ext}")
        } else {
            name.to_string()
        }
    }
}
