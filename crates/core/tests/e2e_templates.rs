//! End-to-end tests over a project scaffolded from the default templates.
//!
//! init -> load_config -> orchestrator -> stored trace -> report

mod common;

use cf_core::config::load_config;
use cf_core::engine::PipelineOrchestrator;
use cf_core::report::{JsonReport, ReportRenderer};
use cf_core::store::{MemoryStore, RunQuery, TrackingStore};
use cf_protocol::activity_models::ActivityStatus;
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::config_models::TrackingBackend;
use cf_protocol::run_models::RunStatus;
use common::*;
use std::sync::Arc;

#[tokio::test]
async fn test_blog_post_pipeline_from_templates() {
    let project = create_test_project(false).await;
    let config = load_config(project.path()).await.expect("config loads");
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::from_config(&config, store.clone()).expect("orchestrator");

    assert_eq!(orchestrator.content_types(), vec!["blog-post", "social-post"]);

    let brief = ContentBrief::new("blog-post", "Zero-downtime Postgres migrations")
        .with_audience("platform engineers")
        .with_keywords(vec!["postgres".to_string(), "migrations".to_string()]);
    let (trace, events) = execute_collecting(&orchestrator, brief).await;

    assert_eq!(trace.run.status, RunStatus::Completed);
    assert_eq!(trace.activities.len(), 7);
    assert!(trace
        .activities
        .iter()
        .all(|record| record.status == ActivityStatus::Completed));
    assert_sealed_trace(&trace);
    assert_durations_bounded(&trace);
    assert_event_sequence(&events);

    let summary = &trace.run.summary;
    assert_eq!(summary.total_tokens, 12900);
    assert_eq!(summary.distinct_documents, 3);
    assert_eq!(summary.content_changes, 5);
    assert!(summary.total_cost > 0.0, "cost estimated from the pricing table");
    assert!(summary.quality_score.is_some());

    let seo = &trace.activities[4];
    assert_eq!(seo.stage_name, "seo-optimization");
    assert_eq!(seo.stage_tag, "optimization");
    assert!(seo.content_pair.is_some());
    assert_eq!(seo.content_changes.len(), 3);
    assert_eq!(seo.metrics.model.as_deref(), Some("gpt-4o"));

    assert_eq!(
        store.get_summary(trace.run.id).await.expect("query"),
        Some(summary.clone())
    );

    let report = JsonReport::new().render(&trace).expect("report");
    let value: serde_json::Value = serde_json::from_str(&report).expect("json");
    assert_eq!(value["timeline"].as_array().map(Vec::len), Some(7));
    assert_eq!(value["summary"]["total_tokens"], 12900);
}

#[tokio::test]
async fn test_minimal_project_runs_social_post() {
    let project = create_test_project(true).await;
    let config = load_config(project.path()).await.expect("config loads");
    let orchestrator =
        PipelineOrchestrator::from_config(&config, Arc::new(MemoryStore::new())).expect("orchestrator");

    assert_eq!(orchestrator.content_types(), vec!["social-post"]);

    let (trace, _) =
        execute_collecting(&orchestrator, ContentBrief::new("social-post", "Launch week")).await;

    assert_eq!(trace.run.status, RunStatus::Completed);
    assert_eq!(trace.activities.len(), 3);
    assert_eq!(trace.run.summary.total_tokens, 1050);
}

#[tokio::test]
async fn test_default_tracking_writes_json_under_project() {
    let project = create_test_project(true).await;
    let config = load_config(project.path()).await.expect("config loads");
    assert_eq!(config.global.tracking.backend, TrackingBackend::Json);

    let tracking = TrackingStore::from_config(&config.global.tracking, project.path());
    let orchestrator =
        PipelineOrchestrator::from_config(&config, tracking.sink()).expect("orchestrator");
    let (trace, _) =
        execute_collecting(&orchestrator, ContentBrief::new("social-post", "Launch week")).await;

    let runs_dir = project.path().join(".contentflow/runs");
    assert!(runs_dir.join(trace.run.id.to_string()).join("run.json").exists());

    let query = tracking.query().expect("json backend is queryable");
    let stored = query.get_run(trace.run.id).await.expect("query").expect("run");
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(query.get_activities(trace.run.id).await.expect("query").len(), 3);
}
