use cf_protocol::*;
use serde_json::json;

#[test]
fn test_pipeline_definition_from_yaml() {
    let yaml_str = r#"
content-type: blog-post
description: Long-form article
stages:
  - keyword-research
  - outline
  - draft
"#;

    let pipeline: PipelineDefinition =
        serde_yaml::from_str(yaml_str).expect("Failed to deserialize PipelineDefinition");

    assert_eq!(pipeline.content_type, "blog-post");
    assert_eq!(pipeline.stages, vec!["keyword-research", "outline", "draft"]);
}

#[test]
fn test_stage_definition_front_matter() {
    let yaml_str = r#"
name: seo-optimization
description: Rewrites headings for search
tag: optimization
model: gpt-4o
inputs:
  - draft
script:
  decisions:
    - Moved primary keyword into the H1
  knowledge:
    - document_id: seo-playbook
      document_name: SEO Playbook
      units_consulted: 4
      influence: high
      purpose: heading rules
  content-pair:
    before: "Intro"
    after: "Intro to keywords"
  input-tokens: 1500
  output-tokens: 1000
  quality:
    seo: 0.9
"#;

    let stage: StageDefinition =
        serde_yaml::from_str(yaml_str).expect("Failed to deserialize StageDefinition");

    assert_eq!(stage.name, "seo-optimization");
    assert_eq!(stage.tag(), "optimization");
    assert_eq!(stage.kind, StageKind::Scripted);
    assert_eq!(stage.inputs, vec!["draft"]);
    // The prompt comes from the Markdown body, never from front matter.
    assert!(stage.prompt.is_empty());

    let script = stage.script.expect("script block");
    assert_eq!(script.knowledge[0].influence, Influence::High);
    assert_eq!(script.input_tokens, 1500);
    assert_eq!(
        script.content_pair.map(|pair| pair.after),
        Some("Intro to keywords".to_string())
    );
    assert!(script.fail.is_none());
}

#[test]
fn test_command_stage_definition() {
    let yaml_str = r#"
name: draft
description: External drafting tool
kind: command
command:
  program: ./bin/drafter
  args: ["--fast"]
"#;

    let stage: StageDefinition = serde_yaml::from_str(yaml_str).expect("deserialize");
    assert_eq!(stage.kind, StageKind::Command);
    let command = stage.command.expect("command block");
    assert_eq!(command.program, "./bin/drafter");
    assert_eq!(command.args, vec!["--fast"]);
    assert!(command.working_dir.is_none());
}

#[test]
fn test_global_config_from_toml_shape() {
    // config.toml is parsed with `toml` in the core; the structure is the
    // same when expressed as JSON.
    let config: GlobalConfig = serde_json::from_value(json!({
        "tracking": { "backend": "memory" },
        "orchestrator": { "run-timeout-secs": 60 },
        "pricing": { "gpt-4o": { "input-per-1k": 0.0025, "output-per-1k": 0.01 } }
    }))
    .expect("Failed to deserialize GlobalConfig");

    assert_eq!(config.tracking.backend, TrackingBackend::Memory);
    assert_eq!(config.tracking.directory, ".contentflow/runs");
    assert_eq!(config.orchestrator.run_timeout_secs, Some(60));
    assert!(config.pricing.contains_key("gpt-4o"));
}

#[test]
fn test_run_status_serialization() {
    let json = serde_json::to_value(RunStatus::Running).expect("serialize");
    assert_eq!(json, "running");

    let deserialized: RunStatus = serde_json::from_value(json).expect("deserialize");
    assert_eq!(deserialized, RunStatus::Running);
}

#[test]
fn test_activity_record_serialization() {
    let run_id = uuid::Uuid::new_v4();
    let mut record = ActivityRecord::open(run_id, "editing", "editing", 5, json!({"topic": "x"}));
    record.content_changes.push(ContentChange {
        change_type: ChangeType::Style,
        before: Some("utilize".to_string()),
        after: Some("use".to_string()),
        reason: "plain language".to_string(),
        location: Some("paragraph 2".to_string()),
    });
    record.metrics.model = Some("gpt-4o".to_string());
    record.metrics.input_tokens = 10;

    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(value["status"], "running");
    assert_eq!(value["sequence"], 5);
    assert_eq!(value["content_changes"][0]["change_type"], "style");
    assert_eq!(value["run_id"], run_id.to_string());

    let deserialized: ActivityRecord = serde_json::from_value(value).expect("deserialize");
    assert_eq!(deserialized, record);
}

#[test]
fn test_activity_record_optional_fields_default() {
    let value = json!({
        "run_id": uuid::Uuid::new_v4(),
        "stage_name": "outline",
        "stage_tag": "planning",
        "sequence": 0,
        "status": "completed",
        "started_at": "2026-01-01T00:00:00Z"
    });

    let record: ActivityRecord = serde_json::from_value(value).expect("deserialize");
    assert!(record.decisions.is_empty());
    assert!(record.content_pair.is_none());
    assert_eq!(record.metrics.total_tokens(), 0);
    assert!(record.is_sealed());
}

#[test]
fn test_event_serialization() {
    let run_id = uuid::Uuid::new_v4();
    let event = Event::StageCompleted {
        run_id,
        stage_name: "outline".to_string(),
        sequence: 1,
        duration_ms: 1200,
    };

    let json = serde_json::to_value(&event).expect("Failed to serialize Event");
    assert_eq!(json["type"], "stageCompleted");
    assert_eq!(json["payload"]["stage_name"], "outline");
    assert_eq!(json["payload"]["duration_ms"], 1200);

    let deserialized: Event = serde_json::from_value(json).expect("Failed to deserialize Event");
    assert_eq!(deserialized.run_id(), run_id);
    assert!(!deserialized.is_terminal());
}

#[test]
fn test_terminal_events() {
    let run_id = uuid::Uuid::new_v4();
    assert!(Event::RunCompleted { run_id }.is_terminal());
    assert!(Event::RunCancelled {
        run_id,
        completed_stages: 2
    }
    .is_terminal());
    assert!(!Event::RunStarted {
        run_id,
        content_type: "blog-post".to_string(),
        stage_count: 7
    }
    .is_terminal());
}

#[test]
fn test_run_trace_consistency() {
    let brief = ContentBrief::new("social-post", "launch");
    let run_id = uuid::Uuid::new_v4();
    let run = PipelineRun {
        id: run_id,
        content_type: brief.content_type.clone(),
        brief,
        status: RunStatus::Running,
        current_stage: 1,
        created_at: chrono::Utc::now(),
        started_at: Some(chrono::Utc::now()),
        completed_at: None,
        duration_ms: None,
        error_stage: None,
        error_message: None,
        summary: RunSummary::default(),
    };

    let mut first = ActivityRecord::open(run_id, "hook-writer", "writing", 0, json!({}));
    first.status = ActivityStatus::Completed;
    let second = ActivityRecord::open(run_id, "post-drafter", "writing", 1, json!({}));

    let trace = RunTrace {
        run: run.clone(),
        activities: vec![first.clone(), second.clone()],
    };
    assert!(trace.is_consistent());

    // An open record that is not the last one.
    let trace = RunTrace {
        run: run.clone(),
        activities: vec![
            ActivityRecord::open(run_id, "hook-writer", "writing", 0, json!({})),
            {
                let mut record = second.clone();
                record.status = ActivityStatus::Completed;
                record
            },
        ],
    };
    assert!(!trace.is_consistent());

    // A record from another run.
    let mut foreign = second;
    foreign.run_id = uuid::Uuid::new_v4();
    let trace = RunTrace {
        run,
        activities: vec![first, foreign],
    };
    assert!(!trace.is_consistent());
}
