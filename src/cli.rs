use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "docsmith",
    about = "A static documentation compiler and search indexer for project docs"
)]
pub struct Cli {
    /// Override the incremental-build cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile documentation and rebuild the search index
    Build(BuildArgs),
    /// Query a built search index
    Search(SearchArgs),
    /// Drop the incremental-build cache
    Clean,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Build --

#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Root directory of the project to document
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Output directory (default: <root>/dist/docs)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Recompile everything, ignoring the fingerprint cache
    #[arg(long)]
    pub force: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Path to search-index.json (default: ./dist/docs/search-index.json)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docsmith",
            &mut std::io::stdout(),
        );
    }
}
