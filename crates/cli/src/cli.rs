//! Command-line definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Staged content generation with a full activity trace.
#[derive(Parser, Debug)]
#[command(name = "contentflow")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root containing `.contentflow/`.
    #[arg(short, long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold `.contentflow/` with the default stages and pipelines.
    Init(InitArgs),

    /// List the configured content types and their stages.
    Pipelines,

    /// Run the pipeline for a content type.
    Run(RunArgs),

    /// List stored runs, newest first.
    #[command(alias = "ls")]
    List,

    /// Show a stored run and its stage timeline.
    Show {
        run_id: Uuid,
    },

    /// Render a stored run as a JSON report.
    Export(ExportArgs),

    /// Delete a stored run and all of its activity records.
    #[command(alias = "rm")]
    Delete {
        run_id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.contentflow/` directory.
    #[arg(short, long)]
    pub force: bool,

    /// Only scaffold the social-post pipeline.
    #[arg(long)]
    pub minimal: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Content type, e.g. `blog-post`.
    pub content_type: String,

    /// What the content is about.
    pub topic: String,

    #[arg(short, long)]
    pub audience: Option<String>,

    /// Target keyword; repeat for several.
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Print the finished trace as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub run_id: Uuid,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Single-line JSON.
    #[arg(long)]
    pub compact: bool,
}
