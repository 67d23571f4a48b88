//! Test stages and sinks with fully controllable behavior.

use async_trait::async_trait;
use cf_core::stages::{PriorOutputs, Stage, StageError, StageOutput};
use cf_core::store::{ActivitySink, SinkError, SinkResult};
use cf_core::tracker::StageScope;
use cf_protocol::activity_models::{ActivityRecord, ContentChange};
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::run_models::PipelineRun;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A stage whose trace and outcome are set up by the test.
#[derive(Debug, Clone, Default)]
pub struct ProgrammableStage {
    pub name: String,
    pub inputs: Vec<String>,
    pub decisions: Vec<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub content_pair: Option<(String, String)>,
    pub changes: Vec<ContentChange>,
    pub delay: Duration,
    pub fail_with: Option<String>,
}

#[allow(dead_code)]
impl ProgrammableStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn decisions(mut self, decisions: &[&str]) -> Self {
        self.decisions = decisions.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|i| i.to_string()).collect();
        self
    }

    pub fn content_pair(mut self, before: &str, after: &str) -> Self {
        self.content_pair = Some((before.to_string(), after.to_string()));
        self
    }

    pub fn changes(mut self, changes: Vec<ContentChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }
}

#[async_trait]
impl Stage for ProgrammableStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    async fn execute(
        &self,
        scope: &mut StageScope<'_>,
        _brief: &ContentBrief,
        prior: &PriorOutputs,
    ) -> Result<StageOutput, StageError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        for decision in &self.decisions {
            scope.log_decision(decision.clone(), None).await;
        }
        if let Some((before, after)) = &self.content_pair {
            scope.record_content_pair(before.clone(), after.clone()).await;
        }
        for change in &self.changes {
            scope.log_content_change(change.clone()).await;
        }
        if self.input_tokens + self.output_tokens > 0 {
            scope
                .log_model_usage("test-model", self.input_tokens, self.output_tokens, Some(0.0))
                .await;
        }

        match &self.fail_with {
            Some(message) => Err(StageError::Execution(message.clone())),
            None => Ok(StageOutput::new(json!({
                "stage": self.name,
                "prior": prior.len(),
            }))),
        }
    }
}

/// A sink whose every write fails.
#[derive(Debug, Default)]
pub struct FailingSink {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ActivitySink for FailingSink {
    async fn upsert_run(&self, _run: &PipelineRun) -> SinkResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("database is down".to_string()))
    }

    async fn upsert_activity(&self, _record: &ActivityRecord) -> SinkResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("database is down".to_string()))
    }
}
