//! Report rendering.
//!
//! A [`ReportRenderer`] turns a finished (or aborted) [`RunTrace`] into an
//! artifact for people or downstream tools. Only the JSON renderer lives in
//! the core; richer formats plug in behind the same trait.

use crate::aggregate;
use cf_protocol::activity_models::ActivityRecord;
use cf_protocol::run_models::{PipelineRun, RunSummary, RunTrace, TimelineEntry};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// Records are out of order, belong to another run, or more than the
    /// last one is still open.
    #[error("Run {0} has an inconsistent activity trace")]
    InconsistentTrace(uuid::Uuid),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;

pub trait ReportRenderer: Send + Sync {
    /// MIME type of the rendered artifact.
    fn content_type(&self) -> &str;

    fn render(&self, trace: &RunTrace) -> ReportResult<String>;
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    run: &'a PipelineRun,
    summary: RunSummary,
    timeline: Vec<TimelineEntry>,
    activities: &'a [ActivityRecord],
}

/// Pretty-printed JSON with the run, a freshly computed summary, the
/// timeline and every activity record.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReport {
    compact: bool,
}

impl JsonReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line output.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

impl ReportRenderer for JsonReport {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn render(&self, trace: &RunTrace) -> ReportResult<String> {
        if !trace.is_consistent() {
            return Err(ReportError::InconsistentTrace(trace.run.id));
        }

        let document = JsonDocument {
            run: &trace.run,
            summary: aggregate::summarize(&trace.activities),
            timeline: aggregate::timeline(&trace.activities).collect(),
            activities: &trace.activities,
        };

        let rendered = if self.compact {
            serde_json::to_string(&document)?
        } else {
            serde_json::to_string_pretty(&document)?
        };
        Ok(rendered)
    }
}
