//! Subcommand handlers.

use crate::cli::{Cli, Commands, ExportArgs, InitArgs, RunArgs};
use crate::output;
use cf_core::aggregate::timeline;
use cf_core::config::{load_config, AppConfig};
use cf_core::engine::PipelineOrchestrator;
use cf_core::init::{generate_contentflow_structure, InitOptions};
use cf_core::report::{JsonReport, ReportRenderer};
use cf_core::state::RunManager;
use cf_core::store::{RunQuery, TrackingStore};
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::config_models::TrackingBackend;
use cf_protocol::run_models::{RunStatus, RunTrace};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let root = cli.root.as_path();
    match cli.command {
        Commands::Init(args) => init(root, args).await,
        Commands::Pipelines => pipelines(root).await,
        Commands::Run(args) => run(root, args).await,
        Commands::List => list(root).await,
        Commands::Show { run_id } => show(root, run_id).await,
        Commands::Export(args) => export(root, args).await,
        Commands::Delete { run_id } => delete(root, run_id).await,
    }
}

async fn init(root: &Path, args: InitArgs) -> Result<()> {
    let written = generate_contentflow_structure(InitOptions {
        target_dir: root.to_path_buf(),
        force: args.force,
        minimal: args.minimal,
    })
    .await?;

    println!("{} .contentflow/", "Created".green().bold());
    for path in written {
        println!("  {path}");
    }
    Ok(())
}

async fn pipelines(root: &Path) -> Result<()> {
    let config = load(root).await?;
    if config.pipelines.is_empty() {
        println!("No pipelines configured. Run `contentflow init` first.");
        return Ok(());
    }

    for pipeline in &config.pipelines {
        println!("{}  {}", pipeline.content_type.bold(), pipeline.description.dimmed());
        for (index, name) in pipeline.stages.iter().enumerate() {
            let tag = config.stage(name).map(|stage| stage.tag()).unwrap_or("?");
            println!("  {}. {} {}", index + 1, name, format!("[{tag}]").dimmed());
        }
    }
    Ok(())
}

async fn run(root: &Path, args: RunArgs) -> Result<()> {
    let config = load(root).await?;
    let tracking = TrackingStore::from_config(&config.global.tracking, root);
    let orchestrator =
        PipelineOrchestrator::from_config(&config, tracking.sink()).map_err(|e| eyre!(e))?;

    let content_type = args.content_type.clone();
    let mut brief = ContentBrief::new(args.content_type, args.topic).with_keywords(args.keywords);
    if let Some(audience) = args.audience {
        brief = brief.with_audience(audience);
    }

    let (events_tx, mut events_rx) = mpsc::channel(256);
    let manager = Arc::new(RunManager::new(Arc::new(orchestrator), events_tx));
    let run_id = manager.start_run(brief).await.map_err(|e| eyre!(e))?;
    tracing::info!(run_id = %run_id, content_type = %content_type, "Run started");

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Some(line) = output::progress_line(&event) {
                eprintln!("{line}");
            }
            if event.is_terminal() {
                break;
            }
        }
    });

    let interrupt = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "Interrupted; stopping before the next stage".yellow());
                let _ = manager.cancel_run(run_id).await;
            }
        })
    };

    let trace = manager.wait(run_id).await.map_err(|e| eyre!(e))?;
    interrupt.abort();
    let _ = printer.await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&trace)?);
    } else {
        output::print_summary(&trace.run);
    }

    match trace.run.status {
        RunStatus::Failed => Err(eyre!(
            "Run {} failed at stage '{}'",
            trace.run.id,
            trace.run.error_stage.as_deref().unwrap_or("unknown")
        )),
        _ => Ok(()),
    }
}

async fn list(root: &Path) -> Result<()> {
    let query = history(root).await?;
    let runs = query.list_runs().await?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {:<10}  {:<12}  {:>7} tokens  {}",
            run.id,
            output::run_status(run.status),
            run.content_type,
            run.summary.total_tokens,
            run.brief.topic
        );
    }
    Ok(())
}

async fn show(root: &Path, run_id: Uuid) -> Result<()> {
    let query = history(root).await?;
    let trace = stored_trace(query.as_ref(), run_id).await?;

    output::print_summary(&trace.run);
    println!();
    output::print_timeline(timeline(&trace.activities));
    Ok(())
}

async fn export(root: &Path, args: ExportArgs) -> Result<()> {
    let query = history(root).await?;
    let trace = stored_trace(query.as_ref(), args.run_id).await?;

    let renderer = if args.compact {
        JsonReport::new().compact()
    } else {
        JsonReport::new()
    };
    let rendered = renderer.render(&trace)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Wrote".green().bold(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn delete(root: &Path, run_id: Uuid) -> Result<()> {
    let query = history(root).await?;
    if !query.delete_run(run_id).await? {
        bail!("Run {run_id} not found");
    }
    println!("{} {}", "Deleted".green().bold(), run_id);
    Ok(())
}

async fn load(root: &Path) -> Result<AppConfig> {
    load_config(root)
        .await
        .wrap_err_with(|| format!("Failed to load configuration from {}", root.display()))
}

/// Query interface over runs recorded by earlier invocations.
async fn history(root: &Path) -> Result<Arc<dyn RunQuery>> {
    let config = load(root).await?;
    if config.global.tracking.backend != TrackingBackend::Json {
        bail!(
            "Tracking backend {:?} keeps no history between invocations; set backend = \"json\"",
            config.global.tracking.backend
        );
    }
    TrackingStore::from_config(&config.global.tracking, root)
        .query()
        .ok_or_else(|| eyre!("Tracking backend is not queryable"))
}

async fn stored_trace(query: &dyn RunQuery, run_id: Uuid) -> Result<RunTrace> {
    let run = query
        .get_run(run_id)
        .await?
        .ok_or_else(|| eyre!("Run {run_id} not found"))?;
    let activities = query.get_activities(run_id).await?;
    Ok(RunTrace { run, activities })
}
