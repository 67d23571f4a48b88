//! Activity record models.
//!
//! An [`ActivityRecord`] is the trace of one stage execution inside a run:
//! what the stage received, what it decided, which knowledge documents it
//! consulted, how it changed the content, and what it cost. Records are
//! written only by the tracker and become read-only once sealed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a single stage execution.
///
/// Transitions are monotonic: `Running -> Completed` or `Running -> Failed`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Running,
    Completed,
    Failed,
}

impl ActivityStatus {
    /// Whether the record carrying this status is sealed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// One reasoning step logged by a stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Decision {
    /// Assigned by the tracker when the decision is appended.
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// How strongly a consulted document shaped the stage's output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum Influence {
    Low,
    Medium,
    High,
}

/// A knowledge-retrieval consultation recorded by a stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct KnowledgeUsage {
    pub document_id: String,
    pub document_name: String,
    /// Number of chunks (or other retrieval units) consulted.
    pub units_consulted: u32,
    pub influence: Influence,
    pub purpose: String,
}

/// Kind of edit a transforming stage applied.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Addition,
    Removal,
    Rewrite,
    Restructure,
    Keyword,
    Style,
}

/// An incremental content change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ContentChange {
    pub change_type: ChangeType,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    pub reason: String,
    /// Where the change applies, e.g. "heading 2" or "paragraph 4".
    #[serde(default)]
    pub location: Option<String>,
}

/// Full-text snapshot around a transforming stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ContentPair {
    pub before: String,
    pub after: String,
}

/// Cost and quality metrics for one stage execution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct StageMetrics {
    /// First model identifier reported by the stage.
    #[serde(default)]
    pub model: Option<String>,
    /// Number of model calls summed into the token/cost totals.
    #[serde(default)]
    pub model_calls: u32,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    /// Estimated cost in US dollars.
    #[serde(default)]
    pub estimated_cost: f64,
    /// Named quality sub-scores, e.g. `readability` or `seo`.
    #[serde(default)]
    pub quality: BTreeMap<String, f64>,
    /// Qualitative badges in emission order. Not deduplicated.
    #[serde(default)]
    pub badges: Vec<String>,
}

impl StageMetrics {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Single quality figure for the stage.
    ///
    /// Uses the `overall` sub-score when reported, otherwise the mean of
    /// all sub-scores. `None` when the stage reported no quality at all.
    pub fn quality_score(&self) -> Option<f64> {
        if let Some(overall) = self.quality.get("overall") {
            return Some(*overall);
        }
        if self.quality.is_empty() {
            return None;
        }
        let sum: f64 = self.quality.values().sum();
        Some(sum / self.quality.len() as f64)
    }
}

/// The trace of one stage execution within a pipeline run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ActivityRecord {
    #[ts(type = "string")]
    pub run_id: Uuid,

    pub stage_name: String,

    /// Category tag of the stage, e.g. `research` or `optimization`.
    pub stage_tag: String,

    /// Zero-based position of the stage in the pipeline.
    pub sequence: usize,

    pub status: ActivityStatus,

    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Measured on a monotonic clock when the record is sealed.
    #[serde(default)]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub input_summary: serde_json::Value,

    #[serde(default)]
    pub output_summary: serde_json::Value,

    #[serde(default)]
    pub decisions: Vec<Decision>,

    #[serde(default)]
    pub knowledge_usage: Vec<KnowledgeUsage>,

    #[serde(default)]
    pub content_pair: Option<ContentPair>,

    #[serde(default)]
    pub content_changes: Vec<ContentChange>,

    #[serde(default)]
    pub metrics: StageMetrics,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,
}

impl ActivityRecord {
    /// Open a new record in `Running` state.
    pub fn open(
        run_id: Uuid,
        stage_name: impl Into<String>,
        stage_tag: impl Into<String>,
        sequence: usize,
        input_summary: serde_json::Value,
    ) -> Self {
        Self {
            run_id,
            stage_name: stage_name.into(),
            stage_tag: stage_tag.into(),
            sequence,
            status: ActivityStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            input_summary,
            output_summary: serde_json::Value::Null,
            decisions: Vec::new(),
            knowledge_usage: Vec::new(),
            content_pair: None,
            content_changes: Vec::new(),
            metrics: StageMetrics::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_record_is_running() {
        let record = ActivityRecord::open(
            Uuid::new_v4(),
            "outline",
            "planning",
            1,
            serde_json::json!({"topic": "x"}),
        );
        assert_eq!(record.status, ActivityStatus::Running);
        assert!(!record.is_sealed());
        assert!(record.completed_at.is_none());
        assert!(record.decisions.is_empty());
    }

    #[test]
    fn test_quality_score_prefers_overall() {
        let mut metrics = StageMetrics::default();
        metrics.quality.insert("readability".to_string(), 0.2);
        metrics.quality.insert("overall".to_string(), 0.9);
        assert_eq!(metrics.quality_score(), Some(0.9));
    }

    #[test]
    fn test_quality_score_mean_of_sub_scores() {
        let mut metrics = StageMetrics::default();
        assert_eq!(metrics.quality_score(), None);

        metrics.quality.insert("readability".to_string(), 0.5);
        metrics.quality.insert("seo".to_string(), 1.0);
        assert_eq!(metrics.quality_score(), Some(0.75));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ActivityStatus::Running.is_terminal());
        assert!(ActivityStatus::Completed.is_terminal());
        assert!(ActivityStatus::Failed.is_terminal());
    }
}
