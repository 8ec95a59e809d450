use std::{path::Path, sync::Arc};

use rayon::prelude::*;

use crate::{
    error::Result,
    generator::{
        DocEntity, DocsGenerator, GeneratorContext, GeneratorFactory,
        GeneratorOutput,
    },
    text_util,
    walker::TreeSnapshot,
};

/// Look up a built-in generator factory by its registry name.
pub fn builtin_factory(name: &str) -> Option<Box<dyn GeneratorFactory>> {
    match name {
        "markdown-pages" => Some(Box::new(MarkdownPagesFactory)),
        "source-listing" => Some(Box::new(SourceListingFactory)),
        _ => None,
    }
}

// -- markdown-pages --

/// Turns every markdown file in the docs app into a `page` entity.
pub struct MarkdownPagesFactory;

impl GeneratorFactory for MarkdownPagesFactory {
    fn name(&self) -> &str {
        "markdown-pages"
    }

    fn create(
        &self,
        tree: Arc<TreeSnapshot>,
        context: GeneratorContext,
    ) -> Box<dyn DocsGenerator> {
        Box::new(MarkdownPagesGenerator { tree, context })
    }
}

struct MarkdownPagesGenerator {
    tree: Arc<TreeSnapshot>,
    context: GeneratorContext,
}

impl DocsGenerator for MarkdownPagesGenerator {
    fn name(&self) -> &str {
        "markdown-pages"
    }

    fn run(&self) -> Result<GeneratorOutput> {
        let app_root = Path::new(&self.context.docs_app_path);

        let pages: Vec<_> = self
            .tree
            .files_under(app_root)
            .filter(|f| {
                f.relative_path
                    .extension()
                    .is_some_and(|ext| ext == "md")
            })
            .collect();

        // Read in parallel; an unreadable page aborts the pass.
        let entities = pages
            .par_iter()
            .map(|file| {
                let content = std::fs::read_to_string(&file.absolute_path)?;
                let title =
                    text_util::extract_title(&content, &file.relative_path);
                let rel_in_app = file
                    .relative_path
                    .strip_prefix(app_root)
                    .unwrap_or(&file.relative_path);

                Ok(DocEntity {
                    id: page_id(rel_in_app),
                    kind: "page".to_string(),
                    source_path: Some(
                        file.relative_path.to_string_lossy().to_string(),
                    ),
                    body: serde_json::json!({
                        "title": title,
                        "text": content,
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut output = GeneratorOutput::default();
        for entity in &entities {
            if let Some(source) = &entity.source_path {
                output.edit_paths.insert(entity.id.clone(), source.clone());
            }
        }
        output.entities = entities;
        Ok(output)
    }
}

/// Derive a flat page id from a path within the docs app:
/// extension stripped, separators replaced with `-`.
fn page_id(rel_in_app: &Path) -> String {
    rel_in_app
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("-")
}

// -- source-listing --

/// Emits `module` entities listing the project's source and docs-app files,
/// so list views can render a file browser without touching the tree.
pub struct SourceListingFactory;

impl GeneratorFactory for SourceListingFactory {
    fn name(&self) -> &str {
        "source-listing"
    }

    fn create(
        &self,
        tree: Arc<TreeSnapshot>,
        context: GeneratorContext,
    ) -> Box<dyn DocsGenerator> {
        Box::new(SourceListingGenerator { tree, context })
    }
}

struct SourceListingGenerator {
    tree: Arc<TreeSnapshot>,
    context: GeneratorContext,
}

impl SourceListingGenerator {
    fn listing_entity(&self, id: &str, subtree: &str) -> DocEntity {
        let files: Vec<String> = self
            .tree
            .files_under(Path::new(subtree))
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect();

        DocEntity {
            id: id.to_string(),
            kind: "module".to_string(),
            source_path: None,
            body: serde_json::json!({ "files": files }),
        }
    }
}

impl DocsGenerator for SourceListingGenerator {
    fn name(&self) -> &str {
        "source-listing"
    }

    fn run(&self) -> Result<GeneratorOutput> {
        Ok(GeneratorOutput {
            entities: vec![
                self.listing_entity("addon-files", &self.context.source_dir),
                self.listing_entity("app-files", &self.context.docs_app_path),
            ],
            edit_paths: Default::default(),
        })
    }
}
