use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::info;

use crate::{
    cache_db::CacheDb,
    cache_dir::CacheDir,
    compiler,
    config::BuildConfig,
    error::Result,
    extractor::ContentExtractor,
    generator::GeneratorContext,
    incremental,
    indexer,
    project::Project,
    registry::PluginRegistry,
    walker::TreeSnapshot,
};

/// Outcome of one project's compile pass.
#[derive(Debug)]
pub struct ProjectReport {
    pub name: String,
    pub entity_count: usize,
    /// True when the input tree was unchanged and the pass was skipped.
    pub skipped: bool,
}

/// Outcome of a full build invocation.
#[derive(Debug)]
pub struct BuildReport {
    pub projects: Vec<ProjectReport>,
    pub document_count: usize,
    pub index_file: PathBuf,
}

/// Run the full documentation build: snapshot every project tree, compile
/// each through the plugin registry (skipping unchanged trees via the
/// fingerprint cache), extract snippet/page content from the main docs
/// app, and rebuild the search index over the published output.
pub fn run_build(config: &BuildConfig) -> Result<BuildReport> {
    let cache_dir = CacheDir::resolve(config.cache_dir.as_deref())?;
    let cache_db = CacheDb::open(&cache_dir.cache_db())?;
    let registry = PluginRegistry::from_plugin_names(&config.plugins)?;

    let mut projects = vec![Project::discover(
        &config.root,
        config.project_name.as_deref(),
    )?];
    for addon in &config.documented_addons {
        projects.push(Project::discover(&config.root.join(addon), None)?);
    }

    std::fs::create_dir_all(&config.out_dir)?;

    let mut reports = Vec::new();
    let mut main_content = None;

    for (idx, project) in projects.iter().enumerate() {
        let snapshot = Arc::new(snapshot_project(config, &project.root)?);

        // The docs app belongs to the main project; its snippet and page
        // content feeds the search index.
        if idx == 0 {
            let extractor = ContentExtractor::from_config(config)?;
            main_content = Some(extractor.extract(&snapshot)?);
        }

        let skip = !config.force
            && incremental::can_skip_compile(
                &cache_db,
                &project.name,
                &snapshot,
                &config.out_dir,
            )?;

        let report = if skip {
            info!(
                project = %project.name,
                "input tree unchanged; reusing published docs"
            );
            let record = compiler::read_project_record(
                &config.out_dir,
                &project.name,
            )?;
            ProjectReport {
                name: project.name.clone(),
                entity_count: record.entities.len(),
                skipped: true,
            }
        } else {
            let context = GeneratorContext {
                dest_dir: "docs".to_string(),
                project_name: project.name.clone(),
                docs_app_path: config.docs_app_path.clone(),
                source_dir: config.source_dir.clone(),
            };
            let generators =
                registry.create_docs_generators(&snapshot, &context);
            let result =
                compiler::compile(&generators, project, &config.out_dir)?;
            incremental::record_snapshot(&cache_db, &project.name, &snapshot)?;
            info!(
                project = %project.name,
                entities = result.entity_count,
                "compiled documentation"
            );
            ProjectReport {
                name: project.name.clone(),
                entity_count: result.entity_count,
                skipped: false,
            }
        };
        reports.push(report);
    }

    let content = main_content.unwrap_or_default();
    let project_names: Vec<String> =
        projects.iter().map(|p| p.name.clone()).collect();
    let documents = indexer::collect_documents(
        &config.out_dir,
        &project_names,
        &projects[0].name,
        &config.assets_url_path,
        &content,
    )?;
    let artifact = indexer::build_index(&documents);
    let index_file = config.out_dir.join("search-index.json");
    indexer::write_index(&artifact, &index_file)?;
    info!(documents = documents.len(), "search index written");

    Ok(BuildReport {
        projects: reports,
        document_count: documents.len(),
        index_file,
    })
}

/// Snapshot the documentable parts of a project: the source subtree, the
/// docs app, and the top-level manifest/readme.
fn snapshot_project(config: &BuildConfig, root: &Path) -> Result<TreeSnapshot> {
    TreeSnapshot::build(
        root,
        &[
            PathBuf::from(&config.source_dir),
            PathBuf::from(&config.docs_app_path),
        ],
        &[PathBuf::from("Cargo.toml"), PathBuf::from("README.md")],
    )
}

/// Drop the incremental-build cache.
pub fn clean_cache(explicit_cache_dir: Option<&Path>) -> Result<PathBuf> {
    let cache_dir = CacheDir::resolve(explicit_cache_dir)?;
    let db_path = cache_dir.cache_db();
    if db_path.exists() {
        std::fs::remove_file(&db_path)?;
    }
    Ok(db_path)
}
