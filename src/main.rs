use clap::Parser;
use tracing_subscriber::EnvFilter;

use docsmith::{
    cli::{Cli, Command},
    config::{BuildConfig, CliOverrides, DEFAULT_OUT_DIR},
    error,
    indexer, pipeline,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCSMITH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build(args) => {
            let config = BuildConfig::resolve(
                &args.root,
                CliOverrides {
                    out_dir: args.out,
                    cache_dir: cli.cache_dir,
                    force: args.force,
                },
            )?;
            let report = pipeline::run_build(&config)?;

            for project in &report.projects {
                let note = if project.skipped { " (unchanged)" } else { "" };
                println!(
                    "{}: {} entities{note}",
                    project.name, project.entity_count
                );
            }
            println!(
                "indexed {} documents -> {}",
                report.document_count,
                report.index_file.display()
            );
        }
        Command::Search(args) => {
            let index_path = args.index.unwrap_or_else(|| {
                std::path::Path::new(DEFAULT_OUT_DIR)
                    .join("search-index.json")
            });
            let artifact = indexer::read_index(&index_path)?;
            let results = indexer::query_index(&artifact, &args.query);

            if args.json {
                let rows: Vec<_> = results
                    .iter()
                    .take(args.count)
                    .map(|(id, meta)| {
                        serde_json::json!({
                            "id": id,
                            "title": meta.title,
                            "url": meta.url,
                            "project": meta.project,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "query": args.query,
                        "results": rows,
                    }))?
                );
            } else if results.is_empty() {
                println!("No results found.");
            } else {
                for (id, meta) in results.iter().take(args.count) {
                    println!(
                        "{}\t{}\t{} ({})",
                        id, meta.title, meta.url, meta.project
                    );
                }
            }
        }
        Command::Clean => {
            let removed =
                pipeline::clean_cache(cli.cache_dir.as_deref())?;
            println!("Removed {}", removed.display());
        }
        Command::Completions(args) => {
            args.generate();
        }
    }

    Ok(())
}
