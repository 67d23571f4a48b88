//! Custom assertion helpers over run traces and events.

use cf_protocol::activity_models::ActivityStatus;
use cf_protocol::ipc::Event;
use cf_protocol::run_models::RunTrace;

/// Record statuses in sequence order.
#[allow(dead_code)]
pub fn statuses(trace: &RunTrace) -> Vec<ActivityStatus> {
    trace.activities.iter().map(|record| record.status).collect()
}

/// Stage durations never add up to more than the run's own duration.
#[allow(dead_code)]
pub fn assert_durations_bounded(trace: &RunTrace) {
    let run_duration = trace
        .run
        .duration_ms
        .expect("terminal run should have a duration");
    let stage_total: u64 = trace
        .activities
        .iter()
        .map(|record| record.duration_ms.expect("sealed record should have a duration"))
        .sum();
    assert!(
        stage_total <= run_duration,
        "stages took {stage_total}ms but the run only {run_duration}ms"
    );
}

/// Every record is sealed and the trace is internally consistent.
#[allow(dead_code)]
pub fn assert_sealed_trace(trace: &RunTrace) {
    assert!(trace.is_consistent(), "trace should be consistent");
    for record in &trace.activities {
        assert!(
            record.is_sealed(),
            "record '{}' should be sealed, is {:?}",
            record.stage_name,
            record.status
        );
        assert!(record.completed_at.is_some());
    }
}

/// Events start with `RunStarted`, end with exactly one terminal event, and
/// every stage start is matched by a completion or failure.
#[allow(dead_code)]
pub fn assert_event_sequence(events: &[Event]) {
    assert!(!events.is_empty(), "Event sequence is empty");
    assert!(
        matches!(events[0], Event::RunStarted { .. }),
        "First event should be RunStarted, got: {:?}",
        events[0]
    );

    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "exactly one terminal event expected");
    assert!(
        events.last().is_some_and(Event::is_terminal),
        "Last event should be terminal, got: {:?}",
        events.last()
    );

    let started = events
        .iter()
        .filter(|e| matches!(e, Event::StageStarted { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| matches!(e, Event::StageCompleted { .. } | Event::StageFailed { .. }))
        .count();
    assert_eq!(started, finished, "every started stage should finish");
}
