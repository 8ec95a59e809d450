//! docsmith - a static documentation compiler and search indexer.
//!
//! docsmith turns a project's source tree and docs-app pages into a
//! deterministic tree of per-entity JSON documents plus a compact inverted
//! index (`search-index.json`), via a registry of pluggable documentation
//! generators. Unchanged input trees are detected through a fingerprint
//! cache and skipped entirely.
//!
//! # Quick start
//!
//! ```no_run
//! use docsmith::config::{BuildConfig, CliOverrides};
//! use docsmith::pipeline;
//!
//! let config = BuildConfig::resolve(
//!     std::path::Path::new("."),
//!     CliOverrides::default(),
//! )
//! .unwrap();
//!
//! let report = pipeline::run_build(&config).unwrap();
//! for project in &report.projects {
//!     println!("{}: {} entities", project.name, project.entity_count);
//! }
//! ```

pub mod builtin;
pub mod cache_db;
pub mod cache_dir;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod incremental;
pub mod indexer;
pub mod pipeline;
pub mod project;
pub mod registry;
pub mod text_util;
pub mod walker;

pub use cache_db::CacheDb;
pub use cache_dir::CacheDir;
pub use config::BuildConfig;
pub use error::{Error, Result};
pub use generator::{DocEntity, DocsGenerator, GeneratorFactory, GeneratorOutput};
pub use project::Project;
pub use registry::PluginRegistry;
pub use walker::TreeSnapshot;
