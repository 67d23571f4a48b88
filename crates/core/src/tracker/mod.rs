//! Activity tracking for a single pipeline run.
//!
//! The [`ActivityTracker`] owns the run's state and its activity records for
//! the duration of the run. It is the only writer of both. Every mutation is
//! written through to the attached [`ActivitySink`] immediately; a failing
//! sink is logged once and then bypassed, so tracking never fails a stage.

mod scope;

pub use scope::StageScope;

use crate::aggregate::summarize;
use crate::state::run::{cancel_run, complete_run, fail_run, set_current_stage, start_run};
use crate::store::{ActivitySink, SinkError};
use cf_protocol::activity_models::ActivityRecord;
use cf_protocol::config_models::ModelPricing;
use cf_protocol::run_models::{PipelineRun, RunTrace};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Accumulates the activity records of one run and mirrors them to a sink.
pub struct ActivityTracker {
    run: PipelineRun,
    records: Vec<ActivityRecord>,
    sink: Arc<dyn ActivitySink>,
    pricing: BTreeMap<String, ModelPricing>,
    degraded: bool,
    started: Option<Instant>,
}

impl ActivityTracker {
    /// Create a tracker for `run`, writing through to `sink`.
    ///
    /// Pass a [`NullSink`](crate::store::NullSink) to track in memory only.
    pub fn new(run: PipelineRun, sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            run,
            records: Vec::new(),
            sink,
            pricing: BTreeMap::new(),
            degraded: false,
            started: None,
        }
    }

    /// Use `pricing` to estimate cost when a stage reports usage without one.
    pub fn with_pricing(mut self, pricing: BTreeMap<String, ModelPricing>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    /// Records opened so far, in sequence order.
    pub fn activities(&self) -> &[ActivityRecord] {
        &self.records
    }

    /// Whether a sink failure switched the tracker to memory-only mode.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Open a new activity record in `running` state.
    ///
    /// # Panics
    ///
    /// Panics if the run is already terminal or a previous stage's record is
    /// still open. Both indicate a caller bug.
    pub async fn start_stage(
        &mut self,
        name: &str,
        stage_tag: &str,
        input_summary: serde_json::Value,
    ) -> StageScope<'_> {
        assert!(
            !self.run.status.is_terminal(),
            "cannot start stage '{name}': run {} is already {}",
            self.run.id,
            self.run.status.as_str()
        );
        if let Some(previous) = self.records.last() {
            assert!(
                previous.is_sealed(),
                "cannot start stage '{name}': stage '{}' is still running",
                previous.stage_name
            );
        }

        let sequence = self.records.len();
        set_current_stage(&mut self.run, sequence);
        self.records.push(ActivityRecord::open(
            self.run.id,
            name,
            stage_tag,
            sequence,
            input_summary,
        ));
        tracing::debug!(run_id = %self.run.id, stage = name, sequence, "Stage started");

        self.persist_activity(sequence).await;
        self.persist_run().await;

        StageScope::new(self, sequence)
    }

    /// Transition the run from `pending` to `running`.
    pub async fn mark_running(&mut self) {
        start_run(&mut self.run);
        self.started = Some(Instant::now());
        tracing::info!(run_id = %self.run.id, content_type = %self.run.content_type, "Run started");
        self.persist_run().await;
    }

    /// # Panics
    ///
    /// Panics if a stage record is still open, as do `mark_failed` and
    /// `mark_cancelled`.
    pub async fn mark_completed(&mut self) {
        self.assert_records_sealed("complete");
        let duration_ms = self.elapsed_ms();
        complete_run(&mut self.run, duration_ms);
        self.refresh_summary();
        tracing::info!(
            run_id = %self.run.id,
            stages = self.records.len(),
            total_tokens = self.run.summary.total_tokens,
            "Run completed"
        );
        self.persist_run().await;
    }

    pub async fn mark_failed(&mut self, stage: &str, message: &str) {
        self.assert_records_sealed("fail");
        let duration_ms = self.elapsed_ms();
        fail_run(&mut self.run, stage, message, duration_ms);
        self.refresh_summary();
        tracing::warn!(run_id = %self.run.id, stage, error = message, "Run failed");
        self.persist_run().await;
    }

    pub async fn mark_cancelled(&mut self) {
        self.assert_records_sealed("cancel");
        let duration_ms = self.elapsed_ms();
        cancel_run(&mut self.run, duration_ms);
        self.refresh_summary();
        tracing::info!(
            run_id = %self.run.id,
            completed_stages = self.run.summary.completed_stages,
            "Run cancelled"
        );
        self.persist_run().await;
    }

    /// Hand the run and its records to the caller.
    pub fn into_trace(self) -> RunTrace {
        RunTrace {
            run: self.run,
            activities: self.records,
        }
    }

    pub(crate) fn estimate_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.pricing
            .get(model)
            .map(|pricing| pricing.estimate(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    pub(crate) fn record(&self, index: usize) -> &ActivityRecord {
        &self.records[index]
    }

    /// Mutable access for an open record.
    ///
    /// # Panics
    ///
    /// Panics if the record is sealed.
    pub(crate) fn record_mut(&mut self, index: usize) -> &mut ActivityRecord {
        let record = &mut self.records[index];
        assert!(
            !record.is_sealed(),
            "activity record for stage '{}' is sealed ({})",
            record.stage_name,
            record.status.as_str()
        );
        record
    }

    /// Called after a record was mutated through its scope.
    pub(crate) async fn record_changed(&mut self, index: usize) {
        self.persist_activity(index).await;
    }

    /// Called once a record has been sealed.
    pub(crate) async fn record_sealed(&mut self, index: usize) {
        self.refresh_summary();
        self.persist_activity(index).await;
        self.persist_run().await;
    }

    fn assert_records_sealed(&self, action: &str) {
        if let Some(last) = self.records.last() {
            assert!(
                last.is_sealed(),
                "cannot {action} run {}: stage '{}' is still running",
                self.run.id,
                last.stage_name
            );
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn refresh_summary(&mut self) {
        self.run.summary = summarize(&self.records);
    }

    async fn persist_run(&mut self) {
        if self.degraded {
            return;
        }
        if let Err(error) = self.sink.upsert_run(&self.run).await {
            self.degrade(error);
        }
    }

    async fn persist_activity(&mut self, index: usize) {
        if self.degraded {
            return;
        }
        if let Err(error) = self.sink.upsert_activity(&self.records[index]).await {
            self.degrade(error);
        }
    }

    fn degrade(&mut self, error: SinkError) {
        tracing::warn!(
            run_id = %self.run.id,
            error = %error,
            "Activity sink write failed; tracking continues in memory only"
        );
        self.degraded = true;
    }
}
