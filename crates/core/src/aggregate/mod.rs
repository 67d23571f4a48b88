//! Run aggregation.
//!
//! Pure functions over a run's activity records. They hold no state, so the
//! same records always produce the same summary and timeline.

use cf_protocol::activity_models::{ActivityRecord, ActivityStatus};
use cf_protocol::run_models::{RunSummary, TimelineEntry};
use std::collections::BTreeSet;

/// Compute the summary statistics of a run from its activity records.
pub fn summarize(activities: &[ActivityRecord]) -> RunSummary {
    let mut summary = RunSummary {
        stage_count: activities.len(),
        ..RunSummary::default()
    };
    let mut documents = BTreeSet::new();
    let mut quality_scores = Vec::new();

    for record in activities {
        match record.status {
            ActivityStatus::Running => summary.running_stages += 1,
            ActivityStatus::Completed => summary.completed_stages += 1,
            ActivityStatus::Failed => summary.failed_stages += 1,
        }

        summary.total_duration_ms += record.duration_ms.unwrap_or(0);
        summary.total_input_tokens += record.metrics.input_tokens;
        summary.total_output_tokens += record.metrics.output_tokens;
        summary.total_cost += record.metrics.estimated_cost;

        documents.extend(
            record
                .knowledge_usage
                .iter()
                .map(|usage| usage.document_id.as_str()),
        );

        summary.content_changes += record.content_changes.len();
        summary.decisions += record.decisions.len();
        summary.warnings += record.warnings.len();
        summary.errors += record.errors.len();
        summary.badges += record.metrics.badges.len();

        if let Some(score) = record.metrics.quality_score() {
            quality_scores.push(score);
        }
    }

    summary.total_tokens = summary.total_input_tokens + summary.total_output_tokens;
    summary.distinct_documents = documents.len();
    if !quality_scores.is_empty() {
        summary.quality_score =
            Some(quality_scores.iter().sum::<f64>() / quality_scores.len() as f64);
    }

    summary
}

/// Per-stage timing entries ordered by sequence.
///
/// The iterator is lazy and can be cloned to walk the timeline again.
pub fn timeline(
    activities: &[ActivityRecord],
) -> impl Iterator<Item = TimelineEntry> + Clone + '_ {
    let mut ordered: Vec<&ActivityRecord> = activities.iter().collect();
    ordered.sort_by_key(|record| record.sequence);

    ordered.into_iter().map(|record| TimelineEntry {
        sequence: record.sequence,
        stage_name: record.stage_name.clone(),
        started_at: record.started_at,
        completed_at: record.completed_at,
        duration_ms: record.duration_ms,
        status: record.status,
    })
}
