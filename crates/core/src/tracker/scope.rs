use super::ActivityTracker;
use cf_protocol::activity_models::{
    ActivityRecord, ActivityStatus, ContentChange, ContentPair, Decision, KnowledgeUsage,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

/// Write-only view of the activity record for the stage currently running.
///
/// A stage receives `&mut StageScope` and can only append to its own record.
/// Sealing consumes the scope, so only its owner (the orchestrator) can
/// complete or fail the stage.
pub struct StageScope<'t> {
    tracker: &'t mut ActivityTracker,
    index: usize,
    started: Instant,
}

impl<'t> StageScope<'t> {
    pub(super) fn new(tracker: &'t mut ActivityTracker, index: usize) -> Self {
        Self {
            tracker,
            index,
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.tracker.run().id
    }

    pub fn stage_name(&self) -> &str {
        &self.record().stage_name
    }

    /// Current state of the record, as observers see it.
    pub fn record(&self) -> &ActivityRecord {
        self.tracker.record(self.index)
    }

    pub async fn log_decision(
        &mut self,
        description: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        let description = description.into();
        tracing::debug!(stage = %self.stage_name(), %description, "Decision logged");
        self.tracker.record_mut(self.index).decisions.push(Decision {
            timestamp: Utc::now(),
            description,
            data,
        });
        self.changed().await;
    }

    pub async fn log_knowledge_usage(&mut self, usage: KnowledgeUsage) {
        tracing::debug!(
            stage = %self.stage_name(),
            document = %usage.document_id,
            units = usage.units_consulted,
            "Knowledge usage logged"
        );
        self.tracker.record_mut(self.index).knowledge_usage.push(usage);
        self.changed().await;
    }

    pub async fn log_content_change(&mut self, change: ContentChange) {
        self.tracker.record_mut(self.index).content_changes.push(change);
        self.changed().await;
    }

    /// Set the full-text before/after pair. Only the first call takes effect.
    pub async fn record_content_pair(&mut self, before: impl Into<String>, after: impl Into<String>) {
        let record = self.tracker.record_mut(self.index);
        if record.content_pair.is_some() {
            tracing::warn!(
                stage = %record.stage_name,
                "Content pair already recorded; ignoring later pair"
            );
            return;
        }
        record.content_pair = Some(ContentPair {
            before: before.into(),
            after: after.into(),
        });
        self.changed().await;
    }

    /// Add one model call to the record's metrics.
    ///
    /// When `cost` is `None` it is estimated from the pricing table. The
    /// first model reported is the one kept on the record.
    pub async fn log_model_usage(
        &mut self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cost: Option<f64>,
    ) {
        let cost =
            cost.unwrap_or_else(|| self.tracker.estimate_cost(model, input_tokens, output_tokens));
        let metrics = &mut self.tracker.record_mut(self.index).metrics;
        if metrics.model.is_none() {
            metrics.model = Some(model.to_string());
        }
        metrics.model_calls += 1;
        metrics.input_tokens += input_tokens;
        metrics.output_tokens += output_tokens;
        metrics.estimated_cost += cost;
        tracing::debug!(model, input_tokens, output_tokens, cost, "Model usage logged");
        self.changed().await;
    }

    pub async fn add_badge(&mut self, label: impl Into<String>) {
        self.tracker
            .record_mut(self.index)
            .metrics
            .badges
            .push(label.into());
        self.changed().await;
    }

    pub async fn add_warning(&mut self, message: impl Into<String>) {
        self.tracker.record_mut(self.index).warnings.push(message.into());
        self.changed().await;
    }

    pub async fn add_error(&mut self, message: impl Into<String>) {
        self.tracker.record_mut(self.index).errors.push(message.into());
        self.changed().await;
    }

    /// Seal the record as `completed`.
    pub async fn complete_stage(
        self,
        output_summary: serde_json::Value,
        quality: Option<BTreeMap<String, f64>>,
    ) {
        let duration_ms = self.elapsed_ms();
        let record = self.tracker.record_mut(self.index);
        record.output_summary = output_summary;
        if let Some(quality) = quality {
            record.metrics.quality.extend(quality);
        }
        record.status = ActivityStatus::Completed;
        record.completed_at = Some(Utc::now());
        record.duration_ms = Some(duration_ms);
        tracing::info!(
            run_id = %record.run_id,
            stage = %record.stage_name,
            duration_ms,
            "Stage completed"
        );
        self.tracker.record_sealed(self.index).await;
    }

    /// Seal the record as `failed`. The message is also kept as an error.
    pub async fn fail_stage(self, error_message: impl Into<String>) {
        let error_message = error_message.into();
        let duration_ms = self.elapsed_ms();
        let record = self.tracker.record_mut(self.index);
        record.errors.push(error_message.clone());
        record.status = ActivityStatus::Failed;
        record.completed_at = Some(Utc::now());
        record.duration_ms = Some(duration_ms);
        tracing::warn!(
            run_id = %record.run_id,
            stage = %record.stage_name,
            error = %error_message,
            "Stage failed"
        );
        self.tracker.record_sealed(self.index).await;
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    async fn changed(&mut self) {
        self.tracker.record_changed(self.index).await;
    }
}
