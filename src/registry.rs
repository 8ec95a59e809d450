use std::sync::Arc;

use tracing::warn;

use crate::{
    builtin,
    error::{Error, Result},
    generator::{DocsGenerator, GeneratorContext, GeneratorFactory},
    walker::TreeSnapshot,
};

/// One registered plugin: a single generator factory, or a pack of them.
///
/// Packs are flattened in declaration order when generators are created, so
/// a pack behaves exactly like registering its members one by one.
pub enum PluginEntry {
    Generator(Box<dyn GeneratorFactory>),
    Pack {
        name: String,
        plugins: Vec<Box<dyn GeneratorFactory>>,
    },
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        match self {
            PluginEntry::Generator(factory) => factory.name(),
            PluginEntry::Pack { name, .. } => name,
        }
    }
}

/// An ordered registry of documentation-generator plugins.
///
/// Registration order is significant: it determines merge precedence in the
/// compiler (the last-declared generator wins on an entity collision), so
/// the flattened generator list must be stable across builds.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "entries",
                &self.entries.iter().map(PluginEntry::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured plugin names, resolved against the
    /// built-in factories. Unknown names are a fatal configuration error.
    pub fn from_plugin_names(names: &[String]) -> Result<Self> {
        let mut registry = Self::new();
        for name in names {
            let factory =
                builtin::builtin_factory(name).ok_or_else(|| {
                    Error::Config(format!("unknown plugin '{name}'"))
                })?;
            registry.register(factory);
        }
        Ok(registry)
    }

    pub fn register(&mut self, factory: Box<dyn GeneratorFactory>) {
        self.entries.push(PluginEntry::Generator(factory));
    }

    pub fn register_pack(
        &mut self,
        name: impl Into<String>,
        plugins: Vec<Box<dyn GeneratorFactory>>,
    ) {
        self.entries.push(PluginEntry::Pack {
            name: name.into(),
            plugins,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate every registered generator against `tree`.
    ///
    /// Packs are flattened in place. Each generator gets its own clone of
    /// the context and a shared handle to the snapshot; none sees the
    /// others. An empty registry is downgraded to a warning and the build
    /// proceeds without generated API docs.
    pub fn create_docs_generators(
        &self,
        tree: &Arc<TreeSnapshot>,
        context: &GeneratorContext,
    ) -> Vec<Box<dyn DocsGenerator>> {
        if self.entries.is_empty() {
            warn!(
                project = %context.project_name,
                "no documentation plugins registered; \
                 generated API docs will be empty"
            );
            return Vec::new();
        }

        let mut generators = Vec::new();
        for entry in &self.entries {
            match entry {
                PluginEntry::Generator(factory) => {
                    generators
                        .push(factory.create(Arc::clone(tree), context.clone()));
                }
                PluginEntry::Pack { plugins, .. } => {
                    for factory in plugins {
                        generators.push(
                            factory.create(Arc::clone(tree), context.clone()),
                        );
                    }
                }
            }
        }
        generators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{DocEntity, GeneratorOutput};

    struct FixedGenerator {
        name: String,
    }

    impl DocsGenerator for FixedGenerator {
        fn name(&self) -> &str {
            &self.name
        }

        fn run(&self) -> crate::error::Result<GeneratorOutput> {
            Ok(GeneratorOutput {
                entities: vec![DocEntity {
                    id: self.name.clone(),
                    kind: "component".to_string(),
                    source_path: None,
                    body: serde_json::Value::Null,
                }],
                edit_paths: Default::default(),
            })
        }
    }

    struct FixedFactory {
        name: &'static str,
    }

    impl GeneratorFactory for FixedFactory {
        fn name(&self) -> &str {
            self.name
        }

        fn create(
            &self,
            _tree: Arc<TreeSnapshot>,
            _context: GeneratorContext,
        ) -> Box<dyn DocsGenerator> {
            Box::new(FixedGenerator {
                name: self.name.to_string(),
            })
        }
    }

    fn test_setup() -> (Arc<TreeSnapshot>, GeneratorContext) {
        let tmp = tempfile::tempdir().unwrap();
        let tree =
            Arc::new(TreeSnapshot::build(tmp.path(), &[], &[]).unwrap());
        let context = GeneratorContext {
            dest_dir: "docs".to_string(),
            project_name: "main".to_string(),
            docs_app_path: "tests/dummy/app".to_string(),
            source_dir: "addon".to_string(),
        };
        (tree, context)
    }

    #[test]
    fn preserves_declaration_order() {
        let (tree, context) = test_setup();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(FixedFactory { name: "first" }));
        registry.register(Box::new(FixedFactory { name: "second" }));

        let generators = registry.create_docs_generators(&tree, &context);
        let names: Vec<_> = generators.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn flattens_packs_in_place() {
        let (tree, context) = test_setup();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(FixedFactory { name: "before" }));
        registry.register_pack(
            "pack",
            vec![
                Box::new(FixedFactory { name: "pack-a" }),
                Box::new(FixedFactory { name: "pack-b" }),
            ],
        );
        registry.register(Box::new(FixedFactory { name: "after" }));

        let generators = registry.create_docs_generators(&tree, &context);
        let names: Vec<_> = generators.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["before", "pack-a", "pack-b", "after"]);
    }

    #[test]
    fn empty_registry_yields_no_generators() {
        let (tree, context) = test_setup();
        let registry = PluginRegistry::new();
        assert!(registry.create_docs_generators(&tree, &context).is_empty());
    }

    #[test]
    fn unknown_plugin_name_is_fatal() {
        let err =
            PluginRegistry::from_plugin_names(&["no-such-plugin".to_string()])
                .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn builtin_names_resolve() {
        let registry = PluginRegistry::from_plugin_names(&[
            "markdown-pages".to_string(),
            "source-listing".to_string(),
        ])
        .unwrap();
        assert!(!registry.is_empty());
    }
}
