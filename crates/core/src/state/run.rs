//! Pipeline run state machine.
//!
//! Functions for moving a [`PipelineRun`] through its lifecycle:
//! `pending -> running -> {completed | failed | cancelled}`. Every transition
//! asserts its precondition; reaching an illegal transition is a bug in the
//! caller, not a runtime condition.

use cf_protocol::brief_models::ContentBrief;
use cf_protocol::run_models::{PipelineRun, RunStatus, RunSummary};
use chrono::Utc;
use uuid::Uuid;

/// Create a new run in `pending` state for `brief`.
pub fn create_run(brief: ContentBrief) -> PipelineRun {
    create_run_with_id(Uuid::new_v4(), brief)
}

/// Create a new run with a caller-supplied identifier.
pub fn create_run_with_id(id: Uuid, brief: ContentBrief) -> PipelineRun {
    PipelineRun {
        id,
        content_type: brief.content_type.clone(),
        brief,
        status: RunStatus::Pending,
        current_stage: 0,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        duration_ms: None,
        error_stage: None,
        error_message: None,
        summary: RunSummary::default(),
    }
}

/// Transition `pending -> running` and stamp the start time.
pub fn start_run(run: &mut PipelineRun) {
    assert_eq!(
        run.status,
        RunStatus::Pending,
        "run {} can only start from pending",
        run.id
    );
    run.status = RunStatus::Running;
    run.started_at = Some(Utc::now());
}

/// Point the run at the stage being executed. The index never moves back.
pub fn set_current_stage(run: &mut PipelineRun, index: usize) {
    assert_eq!(
        run.status,
        RunStatus::Running,
        "run {} is not running",
        run.id
    );
    assert!(
        index >= run.current_stage,
        "stage index of run {} cannot move back from {} to {}",
        run.id,
        run.current_stage,
        index
    );
    run.current_stage = index;
}

pub fn complete_run(run: &mut PipelineRun, duration_ms: u64) {
    finish(run, RunStatus::Completed, duration_ms);
}

/// Mark the run failed, keeping the failing stage and its message.
pub fn fail_run(run: &mut PipelineRun, stage: &str, message: &str, duration_ms: u64) {
    finish(run, RunStatus::Failed, duration_ms);
    run.error_stage = Some(stage.to_string());
    run.error_message = Some(message.to_string());
}

pub fn cancel_run(run: &mut PipelineRun, duration_ms: u64) {
    finish(run, RunStatus::Cancelled, duration_ms);
}

fn finish(run: &mut PipelineRun, status: RunStatus, duration_ms: u64) {
    assert_eq!(
        run.status,
        RunStatus::Running,
        "run {} cannot become {} from {}",
        run.id,
        status.as_str(),
        run.status.as_str()
    );
    run.status = status;
    run.completed_at = Some(Utc::now());
    run.duration_ms = Some(duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief() -> ContentBrief {
        ContentBrief::new("blog-post", "state machines")
    }

    #[test]
    fn test_create_run() {
        let run = create_run(brief());
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.content_type, "blog-post");
        assert_eq!(run.current_stage, 0);
        assert!(run.started_at.is_none());
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn test_create_run_with_id() {
        let id = Uuid::new_v4();
        let run = create_run_with_id(id, brief());
        assert_eq!(run.id, id);
    }

    #[test]
    fn test_complete_lifecycle() {
        let mut run = create_run(brief());
        start_run(&mut run);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());

        set_current_stage(&mut run, 1);
        set_current_stage(&mut run, 1);
        complete_run(&mut run, 42);

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.duration_ms, Some(42));
        assert!(run.completed_at.is_some());
        assert!(run.error_stage.is_none());
    }

    #[test]
    fn test_fail_run_sets_error_context() {
        let mut run = create_run(brief());
        start_run(&mut run);
        fail_run(&mut run, "draft", "model unavailable", 5);

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_stage.as_deref(), Some("draft"));
        assert_eq!(run.error_message.as_deref(), Some("model unavailable"));
    }

    #[test]
    fn test_cancel_run() {
        let mut run = create_run(brief());
        start_run(&mut run);
        cancel_run(&mut run, 0);
        assert_eq!(run.status, RunStatus::Cancelled);
        assert!(run.error_stage.is_none());
    }

    #[test]
    #[should_panic(expected = "can only start from pending")]
    fn test_start_twice_panics() {
        let mut run = create_run(brief());
        start_run(&mut run);
        start_run(&mut run);
    }

    #[test]
    #[should_panic(expected = "cannot move back")]
    fn test_stage_index_is_monotonic() {
        let mut run = create_run(brief());
        start_run(&mut run);
        set_current_stage(&mut run, 2);
        set_current_stage(&mut run, 1);
    }

    #[test]
    #[should_panic(expected = "cannot become")]
    fn test_terminal_run_is_immutable() {
        let mut run = create_run(brief());
        start_run(&mut run);
        complete_run(&mut run, 1);
        fail_run(&mut run, "late", "too late", 1);
    }
}
