use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{error::Result, walker::TreeSnapshot};

/// One documented unit emitted by a generator.
///
/// Identity within a project is the (kind, id) pair; the compiler merges
/// entities across generators on that key. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntity {
    pub id: String,
    /// Entity type tag, e.g. "component", "class", "page".
    pub kind: String,
    /// File the entity was extracted from, for edit links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Generator-defined structured content. Always JSON-serializable.
    pub body: serde_json::Value,
}

/// The result of running one generator over one project's tree.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOutput {
    /// Emitted entities, in the generator's own order.
    pub entities: Vec<DocEntity>,
    /// Entity id -> originating file path pattern, for edit links.
    pub edit_paths: BTreeMap<String, String>,
}

/// Per-instantiation options handed to a generator factory.
///
/// A generator sees only its own context and the shared tree snapshot,
/// never another generator's configuration or output.
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    /// Name of the output subtree the generator's entities land under.
    pub dest_dir: String,
    /// Name of the project being documented.
    pub project_name: String,
    /// Docs-app pages directory, relative to the project root.
    pub docs_app_path: String,
    /// Documentable source subdirectory, relative to the project root.
    pub source_dir: String,
}

/// A documentation generator instantiated against one tree snapshot.
///
/// `run` is invoked exactly once per build pass. Implementations must be
/// deterministic: the same snapshot yields the same output.
pub trait DocsGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self) -> Result<GeneratorOutput>;
}

/// The statically-declared capability interface every plugin implements.
///
/// Factories are registered explicitly with the plugin registry; there is
/// no runtime probing of duck-typed plugin objects.
pub trait GeneratorFactory: Send + Sync {
    /// Stable plugin name, used for registry lookup from configuration.
    fn name(&self) -> &str;

    /// Instantiate a generator bound to `tree` and `context`.
    fn create(
        &self,
        tree: Arc<TreeSnapshot>,
        context: GeneratorContext,
    ) -> Box<dyn DocsGenerator>;
}
