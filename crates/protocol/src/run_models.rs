//! Pipeline run state models.
//!
//! This module defines the structures for tracking one end-to-end execution
//! of a content pipeline and the aggregate views derived from it.

use crate::activity_models::{ActivityRecord, ActivityStatus};
use crate::brief_models::ContentBrief;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a pipeline run.
///
/// The status progresses through these states:
/// Pending -> Running -> Completed | Failed | Cancelled
///
/// The three right-hand states are terminal; a run never leaves them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run has been accepted but not started yet.
    Pending,

    /// Stages are executing.
    Running,

    /// Every stage completed.
    Completed,

    /// A stage failed; `error_stage` names it.
    Failed,

    /// A cancellation signal or the run deadline stopped the run between stages.
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Aggregate figures computed over a run's activity records.
///
/// Always derived from the records, never set by hand.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct RunSummary {
    pub stage_count: usize,
    pub completed_stages: usize,
    pub failed_stages: usize,
    pub running_stages: usize,
    pub total_duration_ms: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Count of distinct knowledge document ids referenced across stages.
    pub distinct_documents: usize,
    pub content_changes: usize,
    pub decisions: usize,
    pub warnings: usize,
    pub errors: usize,
    pub badges: usize,
    /// Mean of per-stage quality scores; stages without one are excluded.
    pub quality_score: Option<f64>,
}

/// One row of a run timeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct TimelineEntry {
    pub sequence: usize,
    pub stage_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub status: ActivityStatus,
}

/// The runtime state of a single pipeline execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PipelineRun {
    #[ts(type = "string")]
    pub id: Uuid,

    /// Content-type tag, copied from the brief when the run is created.
    pub content_type: String,

    pub brief: ContentBrief,

    pub status: RunStatus,

    /// Zero-based index of the stage currently executing, or the last one
    /// that executed once the run is terminal.
    pub current_stage: usize,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Wall-clock duration on a monotonic clock, set when the run is terminal.
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Name of the stage that failed. Only set on `Failed`.
    #[serde(default)]
    pub error_stage: Option<String>,

    /// Failure message. Only set on `Failed`.
    #[serde(default)]
    pub error_message: Option<String>,

    /// Aggregates over the run's activity records.
    #[serde(default)]
    pub summary: RunSummary,
}

/// A run together with its activity records, in sequence order.
///
/// This is what the orchestrator returns and what report renderers consume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct RunTrace {
    pub run: PipelineRun,
    pub activities: Vec<ActivityRecord>,
}

impl RunTrace {
    /// Records exposed to readers are either sealed or explicitly running.
    /// Only the last record may still be running.
    pub fn is_consistent(&self) -> bool {
        let ordered = self
            .activities
            .iter()
            .enumerate()
            .all(|(index, record)| record.sequence == index && record.run_id == self.run.id);
        let open = self
            .activities
            .iter()
            .filter(|record| !record.is_sealed())
            .count();
        let open_is_last = self
            .activities
            .last()
            .map(|record| open == 0 || (open == 1 && !record.is_sealed()))
            .unwrap_or(open == 0);
        ordered && open_is_last
    }
}
