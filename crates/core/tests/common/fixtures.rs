//! Fixtures for building orchestrators and sample projects.

use cf_core::engine::PipelineOrchestrator;
use cf_core::init::{generate_contentflow_structure, InitOptions};
use cf_core::stages::{Stage, StageRegistry};
use cf_core::store::ActivitySink;
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::ipc::Event;
use cf_protocol::pipeline_models::PipelineDefinition;
use cf_protocol::run_models::RunTrace;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Content type used by the orchestrators built here.
pub const TEST_CONTENT_TYPE: &str = "test-article";

/// An orchestrator with a single pipeline running `stages` in order.
#[allow(dead_code)]
pub fn orchestrator_with<S>(stages: Vec<S>, sink: Arc<dyn ActivitySink>) -> PipelineOrchestrator
where
    S: Stage + 'static,
{
    let mut registry = StageRegistry::new();
    let mut names = Vec::new();
    for stage in stages {
        names.push(stage.name().to_string());
        registry.register(Arc::new(stage));
    }

    PipelineOrchestrator::new(
        registry,
        vec![PipelineDefinition {
            content_type: TEST_CONTENT_TYPE.to_string(),
            description: "Integration test pipeline".to_string(),
            stages: names,
        }],
        sink,
    )
}

#[allow(dead_code)]
pub fn test_brief() -> ContentBrief {
    ContentBrief::new(TEST_CONTENT_TYPE, "Testing content pipelines")
        .with_audience("QA engineers")
        .with_keywords(vec!["testing".to_string(), "pipelines".to_string()])
}

/// Execute a run to completion and collect every event it emitted.
#[allow(dead_code)]
pub async fn execute_collecting(
    orchestrator: &PipelineOrchestrator,
    brief: ContentBrief,
) -> (RunTrace, Vec<Event>) {
    let (tx, mut rx) = mpsc::channel(256);
    let trace = orchestrator
        .execute(brief, CancellationToken::new(), &tx)
        .await
        .expect("brief should resolve");
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (trace, events)
}

/// A temporary project scaffolded from the default templates.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub async fn create_test_project(minimal: bool) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    generate_contentflow_structure(InitOptions {
        target_dir: temp_dir.path().to_path_buf(),
        force: false,
        minimal,
    })
    .await
    .expect("templates should scaffold");
    temp_dir
}
