use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::{
    compiler,
    error::{Error, Result},
    extractor::ExtractedContent,
    generator::DocEntity,
    text_util,
};

/// Characters escaped when an id or path segment is embedded in a URL.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// A token-indexable record derived from an entity, page, or snippet.
///
/// Owns every piece of text needed at query time; the client never goes
/// back to the documentation tree to render a search result.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    /// Globally unique id, namespaced by project (`<project>:<id>`).
    pub id: String,
    pub project: String,
    pub title: String,
    pub text: String,
    pub url: String,
}

/// Displayable metadata stored per document in the serialized index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: String,
    pub url: String,
    pub project: String,
}

/// The serialized inverted index written to `search-index.json`.
///
/// Every id in a token's posting list has an entry in `documents`; posting
/// lists are sorted for reproducibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIndexArtifact {
    pub tokens: BTreeMap<String, Vec<String>>,
    pub documents: BTreeMap<String, DocumentMeta>,
}

/// Derive search documents from the written documentation tree plus the
/// extracted page/snippet content.
///
/// Entities are read back from the output tree (via each project's record),
/// so the index always reflects the published artifacts, including
/// projects whose compile pass was skipped as unchanged. An unreadable or
/// malformed document is fatal for the index stage only.
pub fn collect_documents(
    out_dir: &Path,
    project_names: &[String],
    main_project: &str,
    assets_url_path: &str,
    content: &ExtractedContent,
) -> Result<Vec<SearchDocument>> {
    let mut documents = Vec::new();

    for project in project_names {
        let record = compiler::read_project_record(out_dir, project)
            .map_err(|e| Error::Index(e.to_string()))?;

        for entry in &record.entities {
            let path = out_dir.join(&entry.path);
            let entity: DocEntity = std::fs::read_to_string(&path)
                .map_err(|e| {
                    Error::Index(format!(
                        "unreadable entity {}: {e}",
                        path.display()
                    ))
                })
                .and_then(|text| {
                    serde_json::from_str(&text).map_err(|e| {
                        Error::Index(format!(
                            "malformed entity {}: {e}",
                            path.display()
                        ))
                    })
                })?;

            let title = entity.body["title"]
                .as_str()
                .unwrap_or(&entity.id)
                .to_string();

            documents.push(SearchDocument {
                id: format!("{project}:{}", entity.id),
                project: project.clone(),
                title,
                text: text_util::flatten_json_text(&entity.body),
                url: doc_url(
                    assets_url_path,
                    &[project, &entity.kind, &entity.id],
                ),
            });
        }
    }

    for (path, text) in &content.pages {
        documents.push(SearchDocument {
            id: format!("{main_project}:pages/{path}"),
            project: main_project.to_string(),
            title: text_util::extract_title(text, Path::new(path)),
            text: text.clone(),
            url: doc_url(assets_url_path, &[main_project, "pages", path]),
        });
    }

    for (name, text) in &content.snippets {
        documents.push(SearchDocument {
            id: format!("{main_project}:snippets/{name}"),
            project: main_project.to_string(),
            title: name.clone(),
            text: text.clone(),
            url: doc_url(assets_url_path, &[main_project, "snippets", name]),
        });
    }

    Ok(documents)
}

/// Build the inverted index over a set of search documents.
///
/// Construction is order-independent: postings are sets keyed by sorted
/// maps, so any traversal order of the same documents yields a structurally
/// equal artifact.
pub fn build_index(documents: &[SearchDocument]) -> SearchIndexArtifact {
    let mut postings: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut metadata: BTreeMap<String, DocumentMeta> = BTreeMap::new();

    for doc in documents {
        metadata.insert(
            doc.id.clone(),
            DocumentMeta {
                title: doc.title.clone(),
                url: doc.url.clone(),
                project: doc.project.clone(),
            },
        );

        let mut tokens = text_util::tokenize(&doc.text);
        tokens.extend(text_util::tokenize(&doc.title));
        for token in tokens {
            postings.entry(token).or_default().insert(doc.id.clone());
        }
    }

    SearchIndexArtifact {
        tokens: postings
            .into_iter()
            .map(|(token, ids)| (token, ids.into_iter().collect()))
            .collect(),
        documents: metadata,
    }
}

/// Write the index artifact wholesale; every build replaces the prior file.
pub fn write_index(
    artifact: &SearchIndexArtifact,
    out_file: &Path,
) -> Result<()> {
    if let Some(parent) = out_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = serde_json::to_vec_pretty(artifact)?;
    bytes.push(b'\n');
    std::fs::write(out_file, bytes)?;
    Ok(())
}

pub fn read_index(path: &Path) -> Result<SearchIndexArtifact> {
    let contents = std::fs::read_to_string(path).map_err(|_| {
        Error::NotFound {
            kind: "search index",
            name: path.display().to_string(),
        }
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Look up the documents matching every token of `query`.
///
/// Intersection of the per-token posting sets, in sorted id order. This is
/// the same retrieval the client performs against the artifact.
pub fn query_index<'a>(
    artifact: &'a SearchIndexArtifact,
    query: &str,
) -> Vec<(&'a str, &'a DocumentMeta)> {
    let tokens = text_util::tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut matched: Option<BTreeSet<&str>> = None;
    for token in &tokens {
        let ids: BTreeSet<&str> = artifact
            .tokens
            .get(token)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default();
        matched = Some(match matched {
            None => ids,
            Some(prev) => prev.intersection(&ids).copied().collect(),
        });
    }

    matched
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| {
            artifact.documents.get(id).map(|meta| (id, meta))
        })
        .collect()
}

fn doc_url(assets_url_path: &str, segments: &[&str]) -> String {
    let encoded: Vec<String> = segments
        .iter()
        .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
        .collect();
    format!("{assets_url_path}{}", encoded.join("/"))
}
