//! Terminal formatting for command output.

use cf_protocol::activity_models::ActivityStatus;
use cf_protocol::ipc::Event;
use cf_protocol::run_models::{PipelineRun, RunStatus, RunSummary, TimelineEntry};
use colored::{ColoredString, Colorize};

pub fn run_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Pending => status.as_str().dimmed(),
        RunStatus::Running => status.as_str().cyan(),
        RunStatus::Completed => status.as_str().green(),
        RunStatus::Failed => status.as_str().red(),
        RunStatus::Cancelled => status.as_str().yellow(),
    }
}

pub fn activity_status(status: ActivityStatus) -> ColoredString {
    match status {
        ActivityStatus::Running => status.as_str().cyan(),
        ActivityStatus::Completed => status.as_str().green(),
        ActivityStatus::Failed => status.as_str().red(),
    }
}

/// One progress line per event, or `None` for events not worth showing.
pub fn progress_line(event: &Event) -> Option<String> {
    match event {
        Event::RunStarted {
            run_id,
            content_type,
            stage_count,
        } => Some(format!(
            "{} {} ({} stages) {}",
            "▶".bold(),
            content_type.bold(),
            stage_count,
            run_id.to_string().dimmed()
        )),
        Event::StageStarted {
            stage_name,
            sequence,
            ..
        } => Some(format!("  [{}] {} ...", sequence + 1, stage_name)),
        Event::StageCompleted {
            stage_name,
            duration_ms,
            ..
        } => Some(format!("  {} {} ({}ms)", "✓".green(), stage_name, duration_ms)),
        Event::StageFailed {
            stage_name, error, ..
        } => Some(format!("  {} {}: {}", "✗".red(), stage_name, error)),
        Event::RunCancelled {
            completed_stages, ..
        } => Some(format!(
            "{} after {} completed stage(s)",
            "cancelled".yellow(),
            completed_stages
        )),
        Event::RunStatusUpdate { .. }
        | Event::RunCompleted { .. }
        | Event::RunFailed { .. } => None,
    }
}

pub fn print_summary(run: &PipelineRun) {
    let summary: &RunSummary = &run.summary;
    println!("{} {}", "Run".bold(), run.id);
    println!("  status:    {}", run_status(run.status));
    println!("  content:   {} / {}", run.content_type, run.brief.topic);
    if let Some(duration) = run.duration_ms {
        println!("  duration:  {duration}ms");
    }
    println!(
        "  stages:    {} completed, {} failed of {}",
        summary.completed_stages, summary.failed_stages, summary.stage_count
    );
    println!(
        "  tokens:    {} ({} in / {} out)",
        summary.total_tokens, summary.total_input_tokens, summary.total_output_tokens
    );
    println!("  cost:      ${:.4}", summary.total_cost);
    println!(
        "  trace:     {} decisions, {} documents, {} changes, {} warnings",
        summary.decisions, summary.distinct_documents, summary.content_changes, summary.warnings
    );
    if let Some(quality) = summary.quality_score {
        println!("  quality:   {quality:.2}");
    }
    if let (Some(stage), Some(message)) = (&run.error_stage, &run.error_message) {
        println!("  {} {}: {}", "error".red().bold(), stage, message);
    }
}

pub fn print_timeline(entries: impl Iterator<Item = TimelineEntry>) {
    for entry in entries {
        let duration = entry
            .duration_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>2}. {:<20} {:<10} {:>8}  {}",
            entry.sequence + 1,
            entry.stage_name,
            activity_status(entry.status),
            duration,
            entry.started_at.format("%H:%M:%S")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_updates_not_printed() {
        let event = Event::RunStatusUpdate {
            run_id: Uuid::new_v4(),
            status: RunStatus::Running,
            stage_index: 0,
        };
        assert!(progress_line(&event).is_none());
    }

    #[test]
    fn test_stage_failure_line_contains_error() {
        colored::control::set_override(false);
        let event = Event::StageFailed {
            run_id: Uuid::new_v4(),
            stage_name: "draft".to_string(),
            sequence: 2,
            error: "quota exceeded".to_string(),
        };
        let line = progress_line(&event).expect("printed");
        assert!(line.contains("draft: quota exceeded"));
    }
}
