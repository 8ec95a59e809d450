use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    generator::{DocEntity, DocsGenerator},
    project::Project,
};

/// One entity's entry in a project record's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub kind: String,
    /// Path of the entity's JSON file, relative to the output root.
    pub path: String,
}

/// The per-project record written to `<name>.json` at the output root.
///
/// Doubles as the manifest enumerating all entities (consumed by the search
/// indexer and runtime list views) and as the project record served to the
/// client over `GET <namespace>/<projectId>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub entities: Vec<ManifestEntry>,
    /// Entity id -> originating file path pattern, for edit links.
    pub edit_paths: BTreeMap<String, String>,
}

/// Result of one compile pass over one project.
#[derive(Debug)]
pub struct CompileResult {
    pub entity_count: usize,
}

/// Run every generator once, merge their outputs, and write the project's
/// documentation tree under `out_dir`.
///
/// Generators run in parallel (each owns an isolated view of the snapshot)
/// and are joined before the merge. Entities are merged by (kind, id) with
/// the last-declared generator winning, then sorted, so repeated builds of
/// the same inputs are byte-identical.
///
/// Output is staged in a scratch directory and swapped in only after every
/// file has been written; a failing generator aborts the pass and leaves
/// the previously published tree untouched.
pub fn compile(
    generators: &[Box<dyn DocsGenerator>],
    project: &Project,
    out_dir: &Path,
) -> Result<CompileResult> {
    let outputs = generators
        .par_iter()
        .map(|generator| {
            generator.run().map_err(|e| Error::Generator {
                name: generator.name().to_string(),
                project: project.name.clone(),
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Merge by (kind, id); later-declared generators override earlier ones.
    let mut merged: BTreeMap<(String, String), DocEntity> = BTreeMap::new();
    let mut edit_paths: BTreeMap<String, String> = BTreeMap::new();
    for output in outputs {
        for entity in output.entities {
            let key = (entity.kind.clone(), entity.id.clone());
            if merged.insert(key, entity).is_some() {
                debug!(project = %project.name, "entity collision resolved last-wins");
            }
        }
        edit_paths.extend(output.edit_paths);
    }

    let staging = out_dir.join(format!(".staging-{}", project.name));
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }

    let mut entries = Vec::with_capacity(merged.len());
    for entity in merged.values() {
        let relative = entity_path(&project.name, entity);
        write_json(&staging.join(&relative), entity)?;
        entries.push(ManifestEntry {
            id: entity.id.clone(),
            kind: entity.kind.clone(),
            path: relative.to_string_lossy().to_string(),
        });
    }

    let record = ProjectRecord {
        name: project.name.clone(),
        tag: project.tag.clone(),
        href: project.href.clone(),
        entities: entries,
        edit_paths,
    };
    write_json(&staging.join(format!("{}.json", project.name)), &record)?;

    swap_into_place(&staging, out_dir, &project.name)?;

    Ok(CompileResult {
        entity_count: merged.len(),
    })
}

/// Relative path of an entity's JSON file: `<name>/<kind>/<id>.json`.
fn entity_path(project_name: &str, entity: &DocEntity) -> PathBuf {
    PathBuf::from(project_name)
        .join(&entity.kind)
        .join(format!("{}.json", entity.id))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Replace the previously published `<name>/` tree and `<name>.json` record
/// with the staged versions. Only reached after a fully successful pass.
fn swap_into_place(
    staging: &Path,
    out_dir: &Path,
    project_name: &str,
) -> Result<()> {
    let entity_dir = out_dir.join(project_name);
    if entity_dir.exists() {
        std::fs::remove_dir_all(&entity_dir)?;
    }
    let staged_entities = staging.join(project_name);
    if staged_entities.exists() {
        std::fs::rename(&staged_entities, &entity_dir)?;
    }

    let record_name = format!("{project_name}.json");
    std::fs::rename(staging.join(&record_name), out_dir.join(&record_name))?;

    std::fs::remove_dir_all(staging)?;
    Ok(())
}

/// Read a previously written project record back from the output tree.
pub fn read_project_record(
    out_dir: &Path,
    project_name: &str,
) -> Result<ProjectRecord> {
    let path = out_dir.join(format!("{project_name}.json"));
    let contents = std::fs::read_to_string(&path).map_err(|_| {
        Error::NotFound {
            kind: "project record",
            name: path.display().to_string(),
        }
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorOutput;

    struct StaticGenerator {
        name: &'static str,
        entities: Vec<DocEntity>,
    }

    impl DocsGenerator for StaticGenerator {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self) -> Result<GeneratorOutput> {
            Ok(GeneratorOutput {
                entities: self.entities.clone(),
                edit_paths: Default::default(),
            })
        }
    }

    struct FailingGenerator;

    impl DocsGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(&self) -> Result<GeneratorOutput> {
            Err(Error::Config("malformed doc block".to_string()))
        }
    }

    fn entity(kind: &str, id: &str, marker: &str) -> DocEntity {
        DocEntity {
            id: id.to_string(),
            kind: kind.to_string(),
            source_path: None,
            body: serde_json::json!({ "marker": marker }),
        }
    }

    fn project(root: &Path) -> Project {
        Project {
            name: "main".to_string(),
            tag: Some("1.0.0".to_string()),
            href: None,
            root: root.to_path_buf(),
        }
    }

    fn generator(
        name: &'static str,
        entities: Vec<DocEntity>,
    ) -> Box<dyn DocsGenerator> {
        Box::new(StaticGenerator { name, entities })
    }

    #[test]
    fn writes_entity_files_and_record() {
        let tmp = tempfile::tempdir().unwrap();
        let generators = vec![generator(
            "g1",
            vec![entity("component", "foo-bar", "a")],
        )];

        let result =
            compile(&generators, &project(tmp.path()), tmp.path()).unwrap();
        assert_eq!(result.entity_count, 1);

        let entity_file = tmp.path().join("main/component/foo-bar.json");
        let written: DocEntity = serde_json::from_str(
            &std::fs::read_to_string(&entity_file).unwrap(),
        )
        .unwrap();
        assert_eq!(written.id, "foo-bar");

        let record = read_project_record(tmp.path(), "main").unwrap();
        assert_eq!(record.name, "main");
        assert_eq!(record.tag.as_deref(), Some("1.0.0"));
        assert_eq!(record.entities.len(), 1);
        assert_eq!(record.entities[0].path, "main/component/foo-bar.json");
    }

    #[test]
    fn deterministic_across_repeated_builds() {
        let tmp = tempfile::tempdir().unwrap();
        let generators = vec![
            generator("g1", vec![entity("component", "b", "1")]),
            generator("g2", vec![entity("class", "a", "2")]),
        ];
        let project = project(tmp.path());

        compile(&generators, &project, tmp.path()).unwrap();
        let first =
            std::fs::read(tmp.path().join("main.json")).unwrap();
        let first_entity =
            std::fs::read(tmp.path().join("main/component/b.json")).unwrap();

        compile(&generators, &project, tmp.path()).unwrap();
        let second =
            std::fs::read(tmp.path().join("main.json")).unwrap();
        let second_entity =
            std::fs::read(tmp.path().join("main/component/b.json")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_entity, second_entity);
    }

    #[test]
    fn later_generator_wins_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let generators = vec![
            generator("g1", vec![entity("component", "x", "from-g1")]),
            generator("g2", vec![entity("component", "x", "from-g2")]),
        ];

        compile(&generators, &project(tmp.path()), tmp.path()).unwrap();

        let written: DocEntity = serde_json::from_str(
            &std::fs::read_to_string(
                tmp.path().join("main/component/x.json"),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(written.body["marker"], "from-g2");
    }

    #[test]
    fn generators_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let solo = vec![generator("g1", vec![entity("component", "one", "a")])];
        compile(&solo, &project(tmp.path()), tmp.path()).unwrap();
        let before = std::fs::read(
            tmp.path().join("main/component/one.json"),
        )
        .unwrap();

        // Adding a second generator with disjoint ids leaves g1's entity
        // byte-identical.
        let both = vec![
            generator("g1", vec![entity("component", "one", "a")]),
            generator("g2", vec![entity("component", "two", "b")]),
        ];
        compile(&both, &project(tmp.path()), tmp.path()).unwrap();
        let after = std::fs::read(
            tmp.path().join("main/component/one.json"),
        )
        .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn failing_generator_aborts_and_preserves_previous_output() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path());

        let good = vec![generator("g1", vec![entity("component", "x", "v1")])];
        compile(&good, &project, tmp.path()).unwrap();

        let bad: Vec<Box<dyn DocsGenerator>> = vec![
            generator("g1", vec![entity("component", "x", "v2")]),
            Box::new(FailingGenerator),
        ];
        let err = compile(&bad, &project, tmp.path()).unwrap_err();
        match err {
            Error::Generator { name, project, .. } => {
                assert_eq!(name, "failing");
                assert_eq!(project, "main");
            }
            other => panic!("expected generator failure, got {other}"),
        }

        // Previous output still authoritative.
        let written: DocEntity = serde_json::from_str(
            &std::fs::read_to_string(
                tmp.path().join("main/component/x.json"),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(written.body["marker"], "v1");
    }

    #[test]
    fn empty_generator_set_writes_bare_record() {
        let tmp = tempfile::tempdir().unwrap();
        let result =
            compile(&[], &project(tmp.path()), tmp.path()).unwrap();
        assert_eq!(result.entity_count, 0);

        let record = read_project_record(tmp.path(), "main").unwrap();
        assert!(record.entities.is_empty());
    }

    #[test]
    fn stale_entities_are_removed_on_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path());

        let with_two = vec![generator(
            "g1",
            vec![entity("component", "a", "1"), entity("component", "b", "2")],
        )];
        compile(&with_two, &project, tmp.path()).unwrap();
        assert!(tmp.path().join("main/component/b.json").exists());

        let with_one =
            vec![generator("g1", vec![entity("component", "a", "1")])];
        compile(&with_one, &project, tmp.path()).unwrap();
        assert!(!tmp.path().join("main/component/b.json").exists());
    }
}
