//! Run manager for coordinating concurrent pipeline runs.
//!
//! The RunManager spawns each run on its own tokio task, keeps a handle for
//! cancelling it, and hands back the final trace when asked to wait.

use crate::engine::PipelineOrchestrator;
use anyhow::{anyhow, Result};
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::ipc::Event;
use cf_protocol::run_models::RunTrace;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<Option<RunTrace>>,
}

/// Manages all runs started in this process.
pub struct RunManager {
    orchestrator: Arc<PipelineOrchestrator>,

    /// Runs that have been started and not yet awaited.
    runs: Arc<Mutex<HashMap<Uuid, RunHandle>>>,

    /// Channel for progress events of every run.
    events_tx: mpsc::Sender<Event>,
}

impl RunManager {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, events_tx: mpsc::Sender<Event>) -> Self {
        Self {
            orchestrator,
            runs: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
        }
    }

    /// Start executing a run for `brief` in the background.
    ///
    /// The run id is returned immediately; progress arrives on the events
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the brief's content type cannot be resolved. No
    /// task is spawned in that case.
    pub async fn start_run(&self, brief: ContentBrief) -> Result<Uuid> {
        let run = self.orchestrator.create_run(brief)?;
        let run_id = run.id;
        let cancel = CancellationToken::new();

        let orchestrator = Arc::clone(&self.orchestrator);
        let events_tx = self.events_tx.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            match orchestrator.run(run, token, &events_tx).await {
                Ok(trace) => Some(trace),
                Err(e) => {
                    tracing::error!(run_id = %run_id, error = %e, "Run could not be executed");
                    None
                }
            }
        });

        self.runs
            .lock()
            .await
            .insert(run_id, RunHandle { cancel, task });
        Ok(run_id)
    }

    /// Request cancellation. The run stops before its next stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not managed here.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<()> {
        let runs = self.runs.lock().await;
        let handle = runs
            .get(&run_id)
            .ok_or_else(|| anyhow!("Run {} not found", run_id))?;
        handle.cancel.cancel();
        Ok(())
    }

    /// Wait for a run to finish and take its trace.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not managed here or its task did not
    /// produce a trace.
    pub async fn wait(&self, run_id: Uuid) -> Result<RunTrace> {
        let handle = self
            .runs
            .lock()
            .await
            .remove(&run_id)
            .ok_or_else(|| anyhow!("Run {} not found", run_id))?;

        handle
            .task
            .await
            .map_err(|e| anyhow!("Run {} task failed: {}", run_id, e))?
            .ok_or_else(|| anyhow!("Run {} did not produce a trace", run_id))
    }

    /// Ids of runs that are still executing.
    pub async fn active_runs(&self) -> Vec<Uuid> {
        let runs = self.runs.lock().await;
        runs.iter()
            .filter(|(_, handle)| !handle.task.is_finished())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of runs started and not yet awaited.
    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }
}
