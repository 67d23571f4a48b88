//! Pipeline orchestrator.
//!
//! The `PipelineOrchestrator` resolves the stage sequence for a run's content
//! type, executes the stages strictly in order, and records each one through
//! an [`ActivityTracker`]. A stage failure ends the run as `failed` but every
//! record collected up to that point is kept in the returned [`RunTrace`].

use crate::config::AppConfig;
use crate::stages::base::{PriorOutputs, Stage, StageError, StageOutput};
use crate::stages::registry::StageRegistry;
use crate::state::run::create_run;
use crate::store::ActivitySink;
use crate::tracker::{ActivityTracker, StageScope};
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::config_models::{GlobalConfig, ModelPricing};
use cf_protocol::ipc::Event;
use cf_protocol::pipeline_models::PipelineDefinition;
use cf_protocol::run_models::{PipelineRun, RunStatus, RunTrace};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Errors in the request itself, reported before a run changes state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("No pipeline is defined for content type '{0}'")]
    UnknownContentType(String),

    #[error("Pipeline '{content_type}' references unknown stage '{stage}'")]
    UnknownStage { content_type: String, stage: String },
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Runs still going after this long are cancelled once the running stage
    /// returns, even when it was the last one.
    pub run_timeout: Option<Duration>,

    /// Per-model prices used when a stage reports usage without a cost.
    pub pricing: BTreeMap<String, ModelPricing>,
}

impl OrchestratorConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            run_timeout: global.orchestrator.run_timeout_secs.map(Duration::from_secs),
            pricing: global.pricing.clone(),
        }
    }
}

/// Drives pipeline runs from brief to trace.
pub struct PipelineOrchestrator {
    registry: StageRegistry,
    pipelines: HashMap<String, PipelineDefinition>,
    sink: Arc<dyn ActivitySink>,
    config: OrchestratorConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        registry: StageRegistry,
        pipelines: Vec<PipelineDefinition>,
        sink: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            registry,
            pipelines: pipelines
                .into_iter()
                .map(|pipeline| (pipeline.content_type.clone(), pipeline))
                .collect(),
            sink,
            config: OrchestratorConfig::default(),
        }
    }

    /// Build an orchestrator from a loaded `.contentflow/` configuration.
    pub fn from_config(config: &AppConfig, sink: Arc<dyn ActivitySink>) -> anyhow::Result<Self> {
        let registry = StageRegistry::from_definitions(&config.stages)?;
        Ok(Self::new(registry, config.pipelines.clone(), sink)
            .with_config(OrchestratorConfig::from_global(&config.global)))
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Known content types, sorted.
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.pipelines.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn pipeline(&self, content_type: &str) -> Option<&PipelineDefinition> {
        self.pipelines.get(content_type)
    }

    /// Ordered stage adapters for `content_type`.
    pub fn resolve(&self, content_type: &str) -> Result<Vec<Arc<dyn Stage>>, PipelineError> {
        let pipeline = self
            .pipelines
            .get(content_type)
            .ok_or_else(|| PipelineError::UnknownContentType(content_type.to_string()))?;
        self.registry.resolve(pipeline)
    }

    /// Validate `brief` and create a `pending` run for it.
    pub fn create_run(&self, brief: ContentBrief) -> Result<PipelineRun, PipelineError> {
        self.resolve(&brief.content_type)?;
        Ok(create_run(brief))
    }

    /// Execute a pending run to a terminal state.
    ///
    /// Request errors are returned before the run is touched. Everything
    /// else, stage failures included, ends up in the returned trace.
    ///
    /// # Panics
    ///
    /// Panics if `run` is not `pending`.
    pub async fn run(
        &self,
        run: PipelineRun,
        cancel: CancellationToken,
        events_tx: &Sender<Event>,
    ) -> Result<RunTrace, PipelineError> {
        assert_eq!(
            run.status,
            RunStatus::Pending,
            "run {} has already been executed",
            run.id
        );
        let stages = self.resolve(&run.content_type)?;

        let run_id = run.id;
        let brief = run.brief.clone();
        let deadline = self.config.run_timeout.map(|timeout| Instant::now() + timeout);
        let mut tracker =
            ActivityTracker::new(run, Arc::clone(&self.sink)).with_pricing(self.config.pricing.clone());

        let _ = events_tx
            .send(Event::RunStarted {
                run_id,
                content_type: brief.content_type.clone(),
                stage_count: stages.len(),
            })
            .await;
        tracker.mark_running().await;
        send_status(&tracker, events_tx).await;

        let mut prior = PriorOutputs::default();
        for (sequence, stage) in stages.iter().enumerate() {
            if let Some(timed_out) = stop_requested(&cancel, deadline) {
                tracing::info!(
                    run_id = %run_id,
                    next_stage = stage.name(),
                    timed_out,
                    "Stopping run before next stage"
                );
                return Ok(finish_cancelled(tracker, events_tx).await);
            }

            let _ = events_tx
                .send(Event::StageStarted {
                    run_id,
                    stage_name: stage.name().to_string(),
                    sequence,
                })
                .await;

            let input_summary = serde_json::json!({
                "topic": brief.topic,
                "inputs": stage.inputs(),
                "prior_stages": prior.stage_names().collect::<Vec<_>>(),
            });
            let mut scope = tracker
                .start_stage(stage.name(), stage.tag(), input_summary)
                .await;
            let outcome = match invoke(stage.as_ref(), &mut scope, &brief, &prior).await {
                Ok(output) => {
                    scope.complete_stage(output.summary, output.quality).await;
                    Ok(output.payload)
                }
                Err(error) => {
                    scope.fail_stage(error.to_string()).await;
                    Err(error)
                }
            };

            match outcome {
                Ok(payload) => {
                    prior.insert(stage.name(), payload);
                    let _ = events_tx
                        .send(Event::StageCompleted {
                            run_id,
                            stage_name: stage.name().to_string(),
                            sequence,
                            duration_ms: tracker.activities()[sequence].duration_ms.unwrap_or(0),
                        })
                        .await;
                }
                Err(error) => {
                    let message = error.to_string();
                    let _ = events_tx
                        .send(Event::StageFailed {
                            run_id,
                            stage_name: stage.name().to_string(),
                            sequence,
                            error: message.clone(),
                        })
                        .await;
                    tracker.mark_failed(stage.name(), &message).await;
                    send_status(&tracker, events_tx).await;
                    let _ = events_tx
                        .send(Event::RunFailed {
                            run_id,
                            stage_name: stage.name().to_string(),
                            error: message,
                        })
                        .await;
                    return Ok(tracker.into_trace());
                }
            }
        }

        // A stop requested while the last stage was running still wins.
        if let Some(timed_out) = stop_requested(&cancel, deadline) {
            tracing::info!(run_id = %run_id, timed_out, "Stopping run after final stage");
            return Ok(finish_cancelled(tracker, events_tx).await);
        }

        tracker.mark_completed().await;
        send_status(&tracker, events_tx).await;
        let _ = events_tx.send(Event::RunCompleted { run_id }).await;

        Ok(tracker.into_trace())
    }

    /// Create a run for `brief` and execute it.
    pub async fn execute(
        &self,
        brief: ContentBrief,
        cancel: CancellationToken,
        events_tx: &Sender<Event>,
    ) -> Result<RunTrace, PipelineError> {
        let run = self.create_run(brief)?;
        self.run(run, cancel, events_tx).await
    }
}

/// Check a stage's preconditions and run it inside its own span.
async fn invoke(
    stage: &dyn Stage,
    scope: &mut StageScope<'_>,
    brief: &ContentBrief,
    prior: &PriorOutputs,
) -> Result<StageOutput, StageError> {
    if let Some(missing) = prior.first_missing(stage.inputs()) {
        return Err(StageError::MissingInput {
            stage: stage.name().to_string(),
            input: missing.to_string(),
        });
    }
    if !stage.check_availability().await {
        return Err(StageError::NotAvailable(format!(
            "Stage '{}' is not available",
            stage.name()
        )));
    }

    let span = tracing::info_span!("stage", run_id = %scope.run_id(), stage = stage.name());
    stage.execute(scope, brief, prior).instrument(span).await
}

/// `Some(timed_out)` when the run must stop: cancelled, or past its deadline.
fn stop_requested(cancel: &CancellationToken, deadline: Option<Instant>) -> Option<bool> {
    let timed_out = deadline.is_some_and(|deadline| Instant::now() >= deadline);
    (cancel.is_cancelled() || timed_out).then_some(timed_out)
}

async fn finish_cancelled(mut tracker: ActivityTracker, events_tx: &Sender<Event>) -> RunTrace {
    tracker.mark_cancelled().await;
    send_status(&tracker, events_tx).await;
    let _ = events_tx
        .send(Event::RunCancelled {
            run_id: tracker.run().id,
            completed_stages: tracker.run().summary.completed_stages,
        })
        .await;
    tracker.into_trace()
}

async fn send_status(tracker: &ActivityTracker, events_tx: &Sender<Event>) {
    let run = tracker.run();
    let _ = events_tx
        .send(Event::RunStatusUpdate {
            run_id: run.id,
            status: run.status,
            stage_index: run.current_stage,
        })
        .await;
}
